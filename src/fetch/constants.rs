//! Constants for the fetch module (request headers, port policy).

/// Accept header restricted to syndication/XML MIME types.
pub const ACCEPT_FEED_TYPES: &str = "application/rss+xml, application/atom+xml, \
    application/rdf+xml, application/feed+json, application/xml;q=0.9, \
    text/xml;q=0.8, */*;q=0.1";

/// Accept-Encoding header; the decoding pipeline handles all three.
pub const ACCEPT_ENCODINGS: &str = "gzip, deflate, br";

/// The only ports a fetch may dial, regardless of scheme.
pub const ALLOWED_PORTS: [u16; 2] = [80, 443];

/// Redirect status codes the walker follows.
pub const FOLLOWED_REDIRECTS: [u16; 5] = [301, 302, 303, 307, 308];

/// Internal buffer size for the brotli decompressor.
pub const BROTLI_BUFFER_SIZE: usize = 4096;
