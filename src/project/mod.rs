// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod convert;
pub mod loader;
pub mod registration;
pub mod types;
pub mod validation;

pub use convert::{convert_config_to_job, resolve_start_time, ConvertError};
pub use loader::{load_config, load_raw_project, project_names, ConfigError, CONFIG_FILE};
pub use registration::{JobRegistration, Schedule};
pub use types::{AcurastCliConfig, Execution, ProjectConfig};
pub use validation::{validate_config, Issue, ValidationError, ValidationOutcome};
