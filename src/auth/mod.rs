// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Browser login flow
//!
//! [`LoginFlow`] drives login, callback and logout against an
//! [`IdentityProvider`](crate::oidc::IdentityProvider) and a
//! [`SessionStore`](crate::session::SessionStore). [`ClientOrigin`] is the
//! request guard used to build the logout return URL.

pub mod flow;
pub mod origin;
pub mod state;

pub use flow::{CallbackParams, LoginFlow};
pub use origin::{ClientOrigin, OriginPolicy};
pub use state::generate_state;
