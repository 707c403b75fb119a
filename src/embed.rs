//! Host page integration
//!
//! `bootstrap` self-initializes a widget from the page's global config object
//! when one is present; `snippet` generates the embed code a site owner pastes
//! into their page.

use crate::config::EmbedConfig;
use crate::error::Result;
use crate::widget::{
    RenderTarget, Scheduler, Widget, WidgetBuilder, WidgetConfig, WidgetHooks, WidgetOptions,
    WidgetSettings,
};
use serde::Deserialize;
use serde_json::Value;

/// Global the host page sets before the loader runs
pub const GLOBAL_CONFIG_KEY: &str = "aiAgentWidgetConfig";

/// Global the live widget instance is exposed as
pub const INSTANCE_KEY: &str = "aiAgentWidget";

/// Mount a widget from the host page's global config object.
///
/// Returns `None` when no config object is present or it cannot be used;
/// the page is left untouched in that case. `defaults` sit underneath the
/// page's own options.
pub fn bootstrap<R: RenderTarget, S: Scheduler>(
    global: Option<&Value>,
    defaults: &WidgetOptions,
    settings: WidgetSettings,
    hooks: WidgetHooks,
    render: R,
    scheduler: S,
) -> Option<Widget<R, S>> {
    let Some(global) = global.filter(|v| !v.is_null()) else {
        tracing::debug!(key = GLOBAL_CONFIG_KEY, "No global widget config; not mounting");
        return None;
    };
    if !global.is_object() {
        tracing::error!(key = GLOBAL_CONFIG_KEY, "Widget config is not an object");
        return None;
    }

    let options = match WidgetOptions::deserialize(global) {
        Ok(options) => defaults.overlay(&options),
        Err(e) => {
            tracing::error!(key = GLOBAL_CONFIG_KEY, error = %e, "Unreadable widget config");
            return None;
        }
    };

    let config = match WidgetConfig::merge(&options) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(key = GLOBAL_CONFIG_KEY, error = %e, "Invalid widget config");
            return None;
        }
    };

    Some(
        WidgetBuilder::new(config)
            .settings(settings)
            .hooks(hooks)
            .mount(render, scheduler),
    )
}

/// Embed code for a host page: the container, the global config object and
/// the loader script.
pub fn snippet(embed: &EmbedConfig, config: &WidgetConfig) -> Result<String> {
    let json = script_safe(&serde_json::to_string_pretty(config)?);
    Ok(format!(
        concat!(
            "<div id=\"{id}\"></div>\n",
            "<script>\n",
            "  window.{key} = {json};\n",
            "</script>\n",
            "<script src=\"{src}\" async></script>\n",
        ),
        id = attribute_safe(&embed.host.container_id),
        key = GLOBAL_CONFIG_KEY,
        json = json.replace('\n', "\n  "),
        src = attribute_safe(&embed.script_url()),
    ))
}

/// JSON that cannot close the surrounding `<script>` element
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn attribute_safe(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
