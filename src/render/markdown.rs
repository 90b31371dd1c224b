use pulldown_cmark::{ html, Options, Parser };

/// Renders CommonMark (tables and strikethrough enabled) to HTML. Any prefix
/// of a document is valid input; unterminated constructs render as text or
/// are closed at the end of input.
pub fn to_html(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut out = String::with_capacity(source.len() + source.len() / 2);
    html::push_html(&mut out, parser);
    out
}
