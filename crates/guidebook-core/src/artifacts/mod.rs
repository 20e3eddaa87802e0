//! # Derived Artifact Builders
//!
//! Secondary page artifacts computed from resolved fields:
//!
//! - `toc` - table of contents (explicit author ToC, else derived from sections)
//! - `breadcrumb` - Home > Guides > Page trail
//! - `faq` - FAQ list with legacy-key fallback and de-duplication
//! - `seo` - SEO title and description
//!
//! Every builder takes the page's [`LocalizationView`](crate::policy::LocalizationView)
//! from the caller instead of deciding localization on its own, so all
//! artifacts of one page agree on whether it is localized.

pub mod breadcrumb;
pub mod faq;
pub mod seo;
pub mod toc;

pub use breadcrumb::BreadcrumbBuilder;
pub use faq::FaqBuilder;
pub use seo::SeoResolver;
pub use toc::{TocBuilder, TocInputs};
