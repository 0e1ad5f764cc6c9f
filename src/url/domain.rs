use crate::{UrlError, UrlResult};
use url::Url;

/// Returns the origin a robots.txt policy and a crawl delay apply to
///
/// The key is `scheme://host[:port]`, with the default port omitted. Two URLs
/// share throttling state and a cached policy exactly when their keys are equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use hearth_crawl::url::origin_key;
///
/// let url = Url::parse("https://Example.com:443/homes/for_sale?page=2").unwrap();
/// assert_eq!(origin_key(&url).unwrap(), "https://example.com");
/// ```
pub fn origin_key(url: &Url) -> UrlResult<String> {
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }
    match url.origin() {
        origin @ url::Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        url::Origin::Opaque(_) => Err(UrlError::InvalidScheme(url.scheme().to_string())),
    }
}
