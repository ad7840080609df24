//! Social share links for an entity page

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShareLinks {
    pub whatsapp: String,
    pub x: String,
    pub facebook: String,
    pub telegram: String,
    pub email: String,
}

impl ShareLinks {
    pub fn new(title: &str, url: &str) -> Self {
        let text = urlencoding::encode(title);
        let url = urlencoding::encode(url);
        Self {
            whatsapp: format!("https://wa.me/?text={text}%20{url}"),
            x: format!("https://twitter.com/intent/tweet?text={text}&url={url}"),
            facebook: format!("https://www.facebook.com/sharer/sharer.php?u={url}"),
            telegram: format!("https://t.me/share/url?url={url}&text={text}"),
            email: format!("mailto:?subject={text}&body={text}%0A{url}"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("whatsapp", self.whatsapp.as_str()),
            ("x", self.x.as_str()),
            ("facebook", self.facebook.as_str()),
            ("telegram", self.telegram.as_str()),
            ("email", self.email.as_str()),
        ]
        .into_iter()
    }
}
