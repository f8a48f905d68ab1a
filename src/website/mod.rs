mod forms;
pub mod html;
mod seo;
mod templates;

pub use forms::{verify_csrf, SecureForm};
pub use seo::Meta;
pub use templates::{template_to_response, Error403, Error404, Error500, HtmlResult};
