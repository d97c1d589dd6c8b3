//! GUI-trace signals: term extraction, corpus narrowing, ranking boosts

pub mod boost;
pub mod trace;

pub use boost::{build_corpus, filter_corpus, get_boosted_files, reorder_rankings};
pub use trace::{extract_gs_terms, extract_sc_terms, parse_trace, GuiTerms, Trace};
