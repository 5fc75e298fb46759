// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Build information and version utilities for roster-server.

/// Format version info for display.
pub fn format_version_info() -> String {
	let git_sha = option_env!("ROSTER_SERVER_GIT_SHA").unwrap_or("unknown");

	format!(
		"roster-server version: {}\n\
         Git SHA:               {}\n\
         Platform:              {}-{}",
		env!("CARGO_PKG_VERSION"),
		git_sha,
		std::env::consts::OS,
		std::env::consts::ARCH,
	)
}
