//! Serde types for the Ichiba item search API (`formatVersion=1` payload).

use serde::Deserialize;

/// Top-level search response. Only the fields the pipeline reads are typed.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemSearchResponse {
    #[serde(rename = "Items", default)]
    pub items: Vec<ItemEnvelope>,
    #[serde(default)]
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemEnvelope {
    #[serde(rename = "Item")]
    pub item: ApiItem,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiItem {
    pub item_name: String,
    pub item_url: String,
    #[serde(default)]
    pub item_price: Option<i64>,
    #[serde(default)]
    pub shop_name: String,
    #[serde(default)]
    pub review_average: Option<f64>,
    #[serde(default)]
    pub review_count: Option<i64>,
    #[serde(default)]
    pub medium_image_urls: Vec<ImageUrl>,
}

impl ApiItem {
    /// The first medium-size image, if the listing has any.
    #[must_use]
    pub fn first_image_url(&self) -> Option<&str> {
        self.medium_image_urls
            .first()
            .map(|i| i.image_url.as_str())
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrl {
    pub image_url: String,
}

/// Error envelope returned instead of `Items` (e.g. `wrong_parameter`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_response_deserializes_items() {
        let json = serde_json::json!({
            "count": 1,
            "Items": [{
                "Item": {
                    "itemName": "薬用 ニキビケア ジェル",
                    "itemUrl": "https://item.rakuten.co.jp/shop/gel/",
                    "itemPrice": 1280,
                    "shopName": "コスメショップ",
                    "reviewAverage": 4.5,
                    "reviewCount": 120,
                    "mediumImageUrls": [{"imageUrl": "https://thumbnail.image.rakuten.co.jp/gel.jpg"}]
                }
            }]
        });

        let resp: ItemSearchResponse = serde_json::from_value(json).expect("should deserialize");
        assert_eq!(resp.items.len(), 1);
        let item = &resp.items[0].item;
        assert_eq!(item.item_price, Some(1280));
        assert_eq!(item.review_count, Some(120));
        assert_eq!(
            item.first_image_url(),
            Some("https://thumbnail.image.rakuten.co.jp/gel.jpg")
        );
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = serde_json::json!({
            "Items": [{"Item": {"itemName": "x", "itemUrl": "https://item.rakuten.co.jp/x/"}}]
        });

        let resp: ItemSearchResponse = serde_json::from_value(json).expect("should deserialize");
        let item = &resp.items[0].item;
        assert!(item.item_price.is_none());
        assert!(item.shop_name.is_empty());
        assert!(item.first_image_url().is_none());
    }
}
