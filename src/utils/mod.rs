// Copyright (c) 2025-2026 the territory contributors
// SPDX-License-Identifier: Apache-2.0

pub mod error;
pub mod progress;
