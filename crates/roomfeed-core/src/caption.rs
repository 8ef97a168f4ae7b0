//! Caption text submitted alongside a published product.

const TITLE_PREVIEW_CHARS: usize = 30;
const PRICE_UNKNOWN: &str = "価格はショップでご確認ください";

/// Render a yen amount with thousands separators, e.g. `12800` → `"12,800円"`.
#[must_use]
pub fn format_price_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}円")
    } else {
        format!("{grouped}円")
    }
}

/// Caption for a real listing: a title preview, price and rating.
#[must_use]
pub fn compose_caption(title: &str, price_yen: Option<i64>, rating: Option<f64>) -> String {
    let preview = title_preview(title);
    let mut caption = format!("✨ {preview}\n\n{}", price_line(price_yen));
    if let Some(rating) = rating {
        caption.push_str(&format!("\n⭐ 評価: {rating:.1}"));
    }
    caption.push_str("\n\nおすすめです！");
    caption
}

/// Caption for a synthetic placeholder; names the keyword it stands in for.
#[must_use]
pub fn compose_synthetic_caption(
    title: &str,
    keyword: &str,
    price_yen: i64,
    rating: f64,
) -> String {
    format!(
        "✨ {title}\n\n価格: {}\n⭐ 評価: {rating:.1}\n\n{keyword}に最適な商品です！",
        format_price_yen(price_yen)
    )
}

fn price_line(price_yen: Option<i64>) -> String {
    match price_yen {
        Some(p) => format!("価格: {}", format_price_yen(p)),
        None => PRICE_UNKNOWN.to_string(),
    }
}

fn title_preview(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.chars().count() <= TITLE_PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(TITLE_PREVIEW_CHARS).collect();
    format!("{head}...")
}
