pub mod entities;
pub mod error;
pub mod link_resolver;
pub mod payload;
pub mod references;
pub mod wiki_markup;

pub use error::MappingError;
pub use link_resolver::LinkResolver;
pub use references::rewrite_jira_keys;
pub use wiki_markup::jira_wiki_to_markdown;
