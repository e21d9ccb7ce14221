//! ra-tools: Research tools for research-assistant
//!
//! - Search: general, news and academic web search (DuckDuckGo)
//! - Wikipedia: page summaries with links
//! - Save: append research output to a text log

pub mod save;
pub mod search;
pub mod web;
pub mod wikipedia;

use std::path::PathBuf;
use std::sync::Arc;

use ra_core::ToolRegistry;

pub use save::{append_entry, log_entry_for, SaveTool, DEFAULT_OUTPUT_FILE};
pub use search::{web_search, SearchBackend, SearchConfig, SearchHit, SearchTool};
pub use web::DuckDuckGo;
pub use wikipedia::{EncyclopediaBackend, PageSummary, Wikipedia, WikipediaConfig, WikipediaTool};

/// Register all five research tools over the given backends.
pub fn create_research_tools_with(
    search: Arc<dyn SearchBackend>,
    encyclopedia: Arc<dyn EncyclopediaBackend>,
    search_config: &SearchConfig,
    wikipedia_config: &WikipediaConfig,
    output_file: impl Into<PathBuf>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchTool::general(search.clone(), search_config)));
    registry.register(Arc::new(SearchTool::news(search.clone(), search_config)));
    registry.register(Arc::new(SearchTool::academic(search, search_config)));
    registry.register(Arc::new(WikipediaTool::new(encyclopedia, wikipedia_config)));
    registry.register(Arc::new(SaveTool::new(output_file)));
    registry
}

/// Register all five research tools over DuckDuckGo and Wikipedia.
pub fn create_research_tools(
    search_config: &SearchConfig,
    wikipedia_config: &WikipediaConfig,
    output_file: impl Into<PathBuf>,
) -> ToolRegistry {
    let search = Arc::new(DuckDuckGo::new(search_config.timeout_secs));
    let encyclopedia = Arc::new(Wikipedia::new(
        wikipedia_config.language.clone(),
        search_config.timeout_secs,
    ));
    create_research_tools_with(search, encyclopedia, search_config, wikipedia_config, output_file)
}
