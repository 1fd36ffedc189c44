use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// Lowercases and splits on non-alphanumeric characters, optionally dropping
/// common English stop words. Queries and chunks go through the same chain.
#[derive(Clone)]
pub struct Analyzer {
	inner: TextAnalyzer,
}

impl Analyzer {
	pub fn new(remove_stop_words: bool) -> Self {
		let inner = if remove_stop_words {
			TextAnalyzer::builder(SimpleTokenizer::default())
				.filter(LowerCaser)
				.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
				.build()
		} else {
			TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build()
		};
		Self { inner }
	}

	pub fn terms(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.inner.clone();
		let mut stream = analyzer.token_stream(text);
		let mut terms = Vec::new();
		while stream.advance() { terms.push(stream.token().text.clone()); }
		terms
	}
}

impl Default for Analyzer {
	fn default() -> Self { Self::new(false) }
}
