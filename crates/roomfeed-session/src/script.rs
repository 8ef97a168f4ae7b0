//! JavaScript snippets evaluated in the page.
//!
//! Every snippet evaluates to a boolean so callers can tell "done" from
//! "nothing matched". Strings are embedded as JSON literals.

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn js_array(items: &[&str]) -> String {
    serde_json::Value::Array(
        items
            .iter()
            .map(|s| serde_json::Value::String((*s).to_string()))
            .collect(),
    )
    .to_string()
}

/// Clicks the first element among `tags` whose visible text contains
/// `text`, falling back to the first match of any `fallback_selectors`.
#[must_use]
pub fn click_by_text(tags: &[&str], text: &str, fallback_selectors: &[&str]) -> String {
    format!(
        r"(() => {{
  const needle = {text};
  for (const tag of {tags}) {{
    for (const el of document.querySelectorAll(tag)) {{
      if ((el.innerText || el.textContent || '').includes(needle)) {{ el.click(); return true; }}
    }}
  }}
  for (const sel of {fallbacks}) {{
    const el = document.querySelector(sel);
    if (el) {{ el.click(); return true; }}
  }}
  return false;
}})()",
        text = js_string(text),
        tags = js_array(tags),
        fallbacks = js_array(fallback_selectors),
    )
}

/// Sets the value of the first element matching any of `selectors` and
/// fires `input` and `change` so framework bindings pick it up.
#[must_use]
pub fn fill_first(selectors: &[&str], value: &str) -> String {
    format!(
        r"(() => {{
  for (const sel of {selectors}) {{
    const el = document.querySelector(sel);
    if (!el) continue;
    el.focus();
    el.value = {value};
    el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    el.dispatchEvent(new Event('change', {{ bubbles: true }}));
    return true;
  }}
  return false;
}})()",
        selectors = js_array(selectors),
        value = js_string(value),
    )
}

/// `true` once any element matches `selector`.
#[must_use]
pub fn exists(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}
