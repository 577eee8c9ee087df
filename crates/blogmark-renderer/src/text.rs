//! Plain text from rendered HTML.

use std::thread;

use lol_html::{HtmlRewriter, Settings, doc_text};

use crate::error::Error;
use crate::pipe::{PipeReader, PipeWriter, pipe};

/// Collect the text content of an HTML stream.
///
/// Markup is dropped, entities are decoded and surrounding whitespace is
/// trimmed. Stops at the first error from the stream or the tokenizer.
pub fn html_text_from_reader(mut reader: PipeReader) -> Result<String, Error> {
    let mut text = String::new();
    let mut rewriter = HtmlRewriter::new(
        Settings {
            document_content_handlers: vec![doc_text!(|chunk| {
                text.push_str(chunk.as_str());
                Ok(())
            })],
            ..Settings::new()
        },
        |_: &[u8]| {},
    );
    while let Some(chunk) = reader.next_chunk()? {
        rewriter
            .write(&chunk)
            .map_err(|e| Error::Html(e.to_string()))?;
    }
    rewriter.end().map_err(|e| Error::Html(e.to_string()))?;

    Ok(html_escape::decode_html_entities(&text).trim().to_owned())
}

/// Run `render` on a producer thread and extract text from what it writes.
///
/// The reader is owned by the consumer so an early consumer failure
/// unblocks the producer instead of leaving it waiting on a full pipe.
pub(crate) fn render_to_text<F>(render: F) -> Result<String, Error>
where
    F: FnOnce(&mut PipeWriter) -> Result<(), Error> + Send,
{
    let (mut writer, reader) = pipe();
    thread::scope(|scope| {
        scope.spawn(move || {
            let result = render(&mut writer);
            writer.close_with_error(result.err());
        });
        html_text_from_reader(reader)
    })
}
