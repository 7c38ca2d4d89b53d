//! S3 XML response bodies.
//!
//! Errors are a flat `<Error>` element; listings are a ListObjectsV2
//! `<ListBucketResult>`.

use std::io;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use selfhost_s3_storage::Object;

/// S3 XML namespace.
const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// `MaxKeys` reported in listings. Listings are never truncated.
const MAX_KEYS: usize = 1000;

/// Format an S3 error as XML.
///
/// # Example output
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <Error>
///   <Code>NoSuchKey</Code>
///   <Message>The specified key does not exist</Message>
///   <Resource>photos/cat.jpg</Resource>
///   <RequestId>4442587f-...</RequestId>
/// </Error>
/// ```
#[must_use]
pub fn error_to_xml(
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: &str,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    // Writing to Vec<u8> is infallible; if this fails it means a logic error.
    if let Err(e) = write_error_xml(&mut buf, code, message, resource, request_id) {
        tracing::error!(error = %e, "failed to serialize S3 error XML");
        buf.clear();
    }
    buf
}

fn write_error_xml(
    buf: &mut Vec<u8>,
    code: &str,
    message: &str,
    resource: Option<&str>,
    request_id: &str,
) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.create_element("Error").write_inner_content(|w| {
        w.create_element("Code")
            .write_text_content(BytesText::new(code))?;
        w.create_element("Message")
            .write_text_content(BytesText::new(message))?;
        if let Some(res) = resource {
            w.create_element("Resource")
                .write_text_content(BytesText::new(res))?;
        }
        w.create_element("RequestId")
            .write_text_content(BytesText::new(request_id))?;
        Ok(())
    })?;

    Ok(())
}

/// Format a ListObjectsV2 result.
///
/// `LastModified` uses ISO 8601 with millisecond precision, which every S3
/// SDK parses.
#[must_use]
pub fn list_objects_to_xml(bucket: &str, prefix: &str, objects: &[Object]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + objects.len() * 256);
    if let Err(e) = write_list_xml(&mut buf, bucket, prefix, objects) {
        tracing::error!(error = %e, "failed to serialize ListBucketResult XML");
        buf.clear();
    }
    buf
}

fn write_list_xml(
    buf: &mut Vec<u8>,
    bucket: &str,
    prefix: &str,
    objects: &[Object],
) -> io::Result<()> {
    let mut writer = Writer::new(buf);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer
        .create_element("ListBucketResult")
        .with_attribute(("xmlns", S3_NAMESPACE))
        .write_inner_content(|w| {
            w.create_element("Name")
                .write_text_content(BytesText::new(bucket))?;
            w.create_element("Prefix")
                .write_text_content(BytesText::new(prefix))?;
            w.create_element("KeyCount")
                .write_text_content(BytesText::new(&objects.len().to_string()))?;
            w.create_element("MaxKeys")
                .write_text_content(BytesText::new(&MAX_KEYS.to_string()))?;
            w.create_element("IsTruncated")
                .write_text_content(BytesText::new("false"))?;

            for object in objects {
                let last_modified = object
                    .last_modified
                    .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                    .to_string();
                w.create_element("Contents").write_inner_content(|c| {
                    c.create_element("Key")
                        .write_text_content(BytesText::new(&object.key))?;
                    c.create_element("LastModified")
                        .write_text_content(BytesText::new(&last_modified))?;
                    c.create_element("ETag")
                        .write_text_content(BytesText::new(&object.etag))?;
                    c.create_element("Size")
                        .write_text_content(BytesText::new(&object.size.to_string()))?;
                    c.create_element("StorageClass")
                        .write_text_content(BytesText::new("STANDARD"))?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;

    Ok(())
}
