// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use handlebars::Handlebars;
use log::error;
use serde_json::json;

use crate::oidc::IdentityClaims;

const TEMPLATE_NAME: &str = "home";

/// Landing page showing the login state
pub struct HomePage {
    handlebars: Handlebars<'static>,
    title: String,
}

impl HomePage {
    pub fn new(title: impl Into<String>) -> Result<Self, handlebars::TemplateError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_template_string(
            TEMPLATE_NAME,
            include_str!("../../resources/templates/home.hbs"),
        )?;
        Ok(Self {
            handlebars,
            title: title.into(),
        })
    }

    pub fn render(&self, profile: Option<&IdentityClaims>) -> Result<String, handlebars::RenderError> {
        let data = match profile {
            Some(profile) => json!({
                "title": self.title,
                "authenticated": true,
                "name": profile.display_name(),
                "picture": profile.picture(),
                "profile": serde_json::to_string_pretty(profile).unwrap_or_default(),
            }),
            None => json!({
                "title": self.title,
                "authenticated": false,
            }),
        };

        self.handlebars.render(TEMPLATE_NAME, &data).map_err(|e| {
            error!("Failed to render home page: {}", e);
            e
        })
    }
}
