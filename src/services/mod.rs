// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod cache;
pub mod coordinator;
pub mod logging;
pub mod request;
pub mod search;
