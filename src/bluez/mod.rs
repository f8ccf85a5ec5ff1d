// hrm-emulator Source Code File
//
// Copyright 2026 The hrm-emulator Developers. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! The BlueZ backend. The adapter is configured and the GATT application and LE advertisement
//! are served over D-Bus through `bluer`.

pub mod adapter;
pub mod manager;
pub mod stack;
