//! Java method extraction with tree-sitter.

use crate::chunk::{split_tokens, windows_to_chunks, Tokenizer};
use crate::domain::{Chunk, ChunkConfig, SplitPolicy, DEFAULT_MAX_TOKENS};
use crate::error::{LocalizeError, Result};
use tree_sitter::{Language, Node, Parser};

const METHOD_KINDS: &[&str] = &["method_declaration"];
const METHOD_AND_CONSTRUCTOR_KINDS: &[&str] = &["method_declaration", "constructor_declaration"];

pub struct MethodChunker {
    max_tokens: usize,
    policy: SplitPolicy,
    include_constructors: bool,
}

impl Default for MethodChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS)
    }
}

impl MethodChunker {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens: max_tokens.max(1), policy: SplitPolicy::Window, include_constructors: false }
    }

    pub fn from_config(config: &ChunkConfig) -> Self {
        Self::new(config.max_tokens)
            .split_policy(config.split_policy)
            .include_constructors(config.include_constructors)
    }

    pub fn split_policy(mut self, policy: SplitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn include_constructors(mut self, include: bool) -> Self {
        self.include_constructors = include;
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Chunk every method of `source`, measuring length with `tokenizer`.
    pub fn chunk<T: Tokenizer + ?Sized>(&self, source: &str, tokenizer: &T) -> Result<Vec<Chunk>> {
        let kinds =
            if self.include_constructors { METHOD_AND_CONSTRUCTOR_KINDS } else { METHOD_KINDS };
        let methods = extract_method_texts(source, kinds)?;

        let mut chunks = Vec::with_capacity(methods.len());
        for method in methods {
            let tokens = tokenizer.tokenize(&method);
            if tokens.len() <= self.max_tokens {
                chunks.push(Chunk { text: method, token_count: tokens.len() });
                continue;
            }

            match self.policy {
                SplitPolicy::Window => {
                    let windows = split_tokens(&tokens, self.max_tokens);
                    chunks.extend(windows_to_chunks(&windows, tokenizer));
                }
                SplitPolicy::Truncate => {
                    let first = &tokens[..self.max_tokens];
                    chunks.push(Chunk { text: tokenizer.detokenize(first), token_count: first.len() });
                }
                SplitPolicy::Drop => {
                    tracing::debug!(tokens = tokens.len(), "dropping oversized method");
                }
            }
        }

        Ok(chunks)
    }
}

fn java_language() -> Language {
    tree_sitter_java::LANGUAGE.into()
}

/// Raw text of every node whose kind is in `kinds`, in document order.
///
/// The tree is walked with an explicit stack so deeply nested class bodies
/// cannot exhaust the call stack. Nodes nested inside a match (methods of an
/// anonymous class, say) are visited as well.
pub fn extract_method_texts(source: &str, kinds: &[&str]) -> Result<Vec<String>> {
    let mut parser = Parser::new();
    parser.set_language(&java_language()).map_err(|e| LocalizeError::Parser(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| LocalizeError::Parser("tree-sitter returned no tree".to_string()))?;

    let mut texts = Vec::new();
    let mut stack: Vec<Node> = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if kinds.contains(&node.kind()) {
            if let Some(text) = source.get(node.start_byte()..node.end_byte()) {
                texts.push(text.to_string());
            }
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    Ok(texts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::WhitespaceTokenizer;

    const SAMPLE: &str = r#"
package io.example;

public class Wallet {
    private int balance = 0;

    public Wallet(int start) {
        this.balance = start;
    }

    public void deposit(int amount) {
        balance += amount;
    }

    public int getBalance() {
        return balance;
    }
}
"#;

    #[test]
    fn extracts_methods_in_document_order() {
        let methods = extract_method_texts(SAMPLE, METHOD_KINDS).unwrap();
        assert_eq!(methods.len(), 2);
        assert!(methods[0].starts_with("public void deposit"));
        assert!(methods[1].starts_with("public int getBalance"));
    }

    #[test]
    fn constructors_are_opt_in() {
        let chunker = MethodChunker::new(512);
        assert_eq!(chunker.chunk(SAMPLE, &WhitespaceTokenizer).unwrap().len(), 2);

        let chunker = MethodChunker::new(512).include_constructors(true);
        let chunks = chunker.chunk(SAMPLE, &WhitespaceTokenizer).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.starts_with("public Wallet(int start)"));
    }

    #[test]
    fn file_without_methods_yields_no_chunks() {
        let source = "public class Constants { public static final int MAX = 3; }";
        let chunks = MethodChunker::default().chunk(source, &WhitespaceTokenizer).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn methods_in_anonymous_classes_are_found() {
        let source = r#"
class Screen {
    void bind() {
        button.setOnClickListener(new View.OnClickListener() {
            public void onClick(View v) { save(); }
        });
    }
}
"#;
        let methods = extract_method_texts(source, METHOD_KINDS).unwrap();
        assert_eq!(methods.len(), 2);
        assert!(methods[1].contains("onClick"));
    }

    #[test]
    fn within_budget_method_is_unmodified() {
        let chunks = MethodChunker::new(512).chunk(SAMPLE, &WhitespaceTokenizer).unwrap();
        assert_eq!(chunks[0].text, "public void deposit(int amount) {\n        balance += amount;\n    }");
        assert_eq!(chunks[0].token_count, 9);
    }

    #[test]
    fn token_counts_match_hand_counted_text() {
        // public int getBalance() { return balance; }
        let chunks = MethodChunker::new(512).chunk(SAMPLE, &WhitespaceTokenizer).unwrap();
        assert_eq!(chunks[1].token_count, 7);

        // budget of 5 over those 7 tokens: windows start at 0 and 2
        let windows = MethodChunker::new(5).chunk(SAMPLE, &WhitespaceTokenizer).unwrap();
        let texts: Vec<&str> = windows.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "public void deposit(int amount) {",
                "deposit(int amount) { balance +=",
                "{ balance += amount; }",
                "public int getBalance() { return",
                "getBalance() { return balance; }",
            ]
        );
        assert_eq!(windows.iter().map(|c| c.token_count).collect::<Vec<_>>(), vec![5, 5, 5, 5, 5]);
    }

    fn long_method(statements: usize) -> String {
        let body: String = (0..statements).map(|i| format!("x{i} = {i};\n")).collect();
        format!("class Big {{\n void run() {{\n{body} }}\n}}\n")
    }

    #[test]
    fn oversized_method_is_windowed() {
        // 3 header tokens + 3 per statement + closing brace
        let source = long_method(20);
        let chunker = MethodChunker::new(16);
        let chunks = chunker.chunk(&source, &WhitespaceTokenizer).unwrap();

        let total = 3 + 20 * 3 + 1;
        let expected = (total - 16usize).div_ceil(8) + 1;
        assert_eq!(chunks.len(), expected);
        assert!(chunks.iter().all(|c| c.token_count <= 16));
        assert!(chunks.last().unwrap().text.ends_with('}'));
    }

    #[test]
    fn truncate_and_drop_policies() {
        let source = long_method(20);

        let truncated = MethodChunker::new(16)
            .split_policy(SplitPolicy::Truncate)
            .chunk(&source, &WhitespaceTokenizer)
            .unwrap();
        assert_eq!(truncated.len(), 1);
        assert_eq!(truncated[0].token_count, 16);
        assert!(truncated[0].text.starts_with("void run()"));

        let dropped = MethodChunker::new(16)
            .split_policy(SplitPolicy::Drop)
            .chunk(&source, &WhitespaceTokenizer)
            .unwrap();
        assert!(dropped.is_empty());
    }
}
