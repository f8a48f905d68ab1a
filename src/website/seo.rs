use std::borrow::Cow;

#[derive(Debug, Clone)]
pub struct Meta<'a> {
    pub meta_title: Cow<'a, str>,
    pub meta_description: Cow<'a, str>,
    pub meta_author: Cow<'a, str>,
}

impl Default for Meta<'_> {
    fn default() -> Self {
        Self {
            meta_title: env!("CARGO_PKG_NAME").into(),
            meta_description: env!("CARGO_PKG_DESCRIPTION").into(),
            meta_author: env!("CARGO_PKG_AUTHORS").into(),
        }
    }
}

impl<'a> Meta<'a> {
    pub fn titled(title: impl Into<Cow<'a, str>>) -> Self {
        Self {
            meta_title: title.into(),
            ..Default::default()
        }
    }

    pub fn described(mut self, description: impl Into<Cow<'a, str>>) -> Self {
        self.meta_description = description.into();
        self
    }
}
