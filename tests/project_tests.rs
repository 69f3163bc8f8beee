// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Include all project test modules
mod common;

mod project {
    mod test_project_flow;
}
