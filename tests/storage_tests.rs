// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Include all storage test modules
mod common;

mod storage {
    mod test_bundle;
    mod test_deployment_records;
}
