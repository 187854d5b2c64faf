//! Social share links for product pages.

use serde::Serialize;
use url::Url;
use utoipa::ToSchema;
use uuid::Uuid;

const FACEBOOK_SHARER: &str = "https://www.facebook.com/sharer/sharer.php";
const WHATSAPP_SHARE: &str = "https://wa.me/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShareLinks {
    pub product_url: String,
    pub facebook: String,
    pub whatsapp: String,
}

/// Public storefront URL of a product.
pub fn product_url(site_url: &str, product_id: Uuid) -> String {
    format!("{}/sp/{}", site_url.trim_end_matches('/'), product_id)
}

pub fn facebook_share_url(url: &str) -> String {
    with_query(FACEBOOK_SHARER, "u", url)
}

pub fn whatsapp_share_url(product_name: &str, url: &str) -> String {
    let message = format!("Découvrez {} sur Mobistore Plus : {}", product_name, url);
    with_query(WHATSAPP_SHARE, "text", &message)
}

pub fn share_links(site_url: &str, product_id: Uuid, product_name: &str) -> ShareLinks {
    let product_url = product_url(site_url, product_id);

    ShareLinks {
        facebook: facebook_share_url(&product_url),
        whatsapp: whatsapp_share_url(product_name, &product_url),
        product_url,
    }
}

fn with_query(base: &str, key: &str, value: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.into()
        }
        Err(_) => base.to_string(),
    }
}
