// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

pub mod analyzer;
pub mod auth;
pub mod controller;
pub mod crawler;
pub mod duplicates;
pub mod fetcher;
pub mod links;
pub mod redirects;
pub mod robots;
pub mod scheduler;
pub mod storage;
pub mod url_norm;
