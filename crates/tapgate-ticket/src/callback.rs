//! The page the wallet redirects to after proving.
//!
//! The page carries the verification result and hands it back to the faucet
//! frontend. When it was opened as a popup it posts
//! `{ authModule, authResult }` to `window.opener`. Otherwise (the wallet
//! navigated the faucet tab itself) it parks the result in
//! `localStorage["<module>.AuthResult"]` and navigates to the faucet origin,
//! where the frontend picks it up on mount.

use serde::Serialize;
use tapgate_protocol::{AuthResult, Codec, JsonCodec};

/// Content type of the callback response.
pub const CALLBACK_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Renders the self-executing handshake page.
pub fn render_callback_page(faucet_title: &str, module: &str, result: &AuthResult) -> String {
    let result_json = script_literal(result, "{}");
    let module_json = script_literal(&module, "\"\"");
    let storage_key = script_literal(&format!("{module}.AuthResult"), "\"\"");

    let title = escape_html(faucet_title);
    format!(
        concat!(
            "<!DOCTYPE html>",
            "<html>",
            "<head>",
            "<meta charset=\"UTF-8\">",
            "<title>{title}: Ticket Auth</title>",
            "</head>",
            "<body>",
            "<script type=\"text/javascript\">",
            "(function() {{",
            "var result = {result};",
            "if(window.opener) {{",
            "window.opener.postMessage({{authModule: {module}, authResult: result}}, location.origin);",
            "}} else {{",
            "localStorage[{key}] = JSON.stringify(result);",
            "location.href = location.origin;",
            "}}",
            "}})();",
            "</script>",
            "</body>",
            "</html>",
        ),
        title = title,
        result = result_json,
        module = module_json,
        key = storage_key,
    )
}

/// Encodes `value` as a JSON literal safe to inline in a `<script>` block.
fn script_literal<T: Serialize>(value: &T, fallback: &str) -> String {
    let json = JsonCodec.encode_str(value).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed encoding callback page value");
        fallback.to_string()
    });
    json.replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
