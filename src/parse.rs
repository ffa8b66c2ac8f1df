//! Public entry points
//!
//! - [`peek_hints`]: read the hints without exposing any pending work
//! - [`parse_hints`]: register deferred loads with a caller-owned resolver
//! - [`parse_and_resolve_hints`]: remaining text plus a ready or pending map
//! - [`consume_hints`]: only the text after the directive
//!
//! When no directive is present the hints come from an empty body and the
//! remaining text is the input, unchanged.

use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::config::Enclosure;
use crate::directive;
use crate::error::Result;
use crate::hints::{HintMap, HintsOutcome};
use crate::resolver::{ModuleLoader, ModuleResolver};

/// What to load for `near`
struct Split<'a, 'p> {
    body: &'a str,
    remainder: &'a str,
    /// Empty when no directive was found, so no prefix entries are added
    prefix: &'p str,
}

fn split<'a, 'p>(near: &'a str, prefix: &'p str, enclosure: &Enclosure) -> Result<Split<'a, 'p>> {
    Ok(match directive::locate(near, prefix, enclosure)? {
        Some(d) => Split {
            body: d.body,
            remainder: d.remainder,
            prefix,
        },
        None => Split {
            body: "",
            remainder: near,
            prefix: "",
        },
    })
}

/// Parse the hints of `near` using a private resolver polled once
///
/// Loads that complete without suspending (JSON files, registered exports) are
/// applied. Any load that would have to wait is abandoned: it never runs to
/// completion, and the map stays loaded but not initialized, so its accessors
/// report [`crate::HintError::UninitializedAccess`] for good. Use
/// [`peek_and_resolve_hints`] to wait for slow loads instead.
pub fn peek_hints(
    near: &str,
    prefix: &str,
    enclosure: &Enclosure,
    loader: Arc<dyn ModuleLoader>,
) -> Result<HintMap> {
    let parts = split(near, prefix, enclosure)?;
    let map = HintMap::new(parts.body);
    let mut resolver = ModuleResolver::new(loader);
    map.load(&mut resolver, parts.prefix)?;

    if resolver.has_pending_work() && resolver.resolve().now_or_never().is_none() {
        debug!(body = map.body(), "peek abandoned deferred hints");
    }
    Ok(map)
}

/// Parse the hints of `near`, handing back a ready map or a future of one
pub fn peek_and_resolve_hints(
    near: &str,
    prefix: &str,
    enclosure: &Enclosure,
    loader: Arc<dyn ModuleLoader>,
) -> Result<HintsOutcome> {
    let parts = split(near, prefix, enclosure)?;
    HintMap::new(parts.body).load_and_resolve(parts.prefix, loader)
}

/// Parse `near` and register its deferred loads with `resolver`
///
/// The map becomes initialized when the caller runs [`ModuleResolver::resolve`],
/// or immediately if it had no deferred entries.
pub fn parse_hints(
    resolver: &mut ModuleResolver,
    near: &str,
    prefix: &str,
    enclosure: &Enclosure,
) -> Result<(String, HintMap)> {
    let parts = split(near, prefix, enclosure)?;
    let map = HintMap::new(parts.body);
    map.load(resolver, parts.prefix)?;
    Ok((parts.remainder.to_string(), map))
}

/// Parse `near` with a private resolver
pub fn parse_and_resolve_hints(
    near: &str,
    prefix: &str,
    enclosure: &Enclosure,
    loader: Arc<dyn ModuleLoader>,
) -> Result<(String, HintsOutcome)> {
    let parts = split(near, prefix, enclosure)?;
    let outcome = HintMap::new(parts.body).load_and_resolve(parts.prefix, loader)?;
    Ok((parts.remainder.to_string(), outcome))
}

/// Text after the directive; the input itself when there is none
pub fn consume_hints(near: &str, prefix: &str, enclosure: &Enclosure) -> Result<String> {
    directive::consume(near, prefix, enclosure)
}
