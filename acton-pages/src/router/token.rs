//! Navigation token parsing

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouteParseError;
use crate::model::EntityId;

/// Parsed `page:<id>(&item:<id>)?` token
///
/// # Example
///
/// ```rust
/// use acton_pages::router::NavigationToken;
///
/// let token: NavigationToken = "page:5&item:42".parse().unwrap();
/// assert_eq!(token.page_id, 5);
/// assert_eq!(token.item_id, Some(42));
/// assert_eq!(token.to_string(), "page:5&item:42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavigationToken {
    /// Page definition id
    pub page_id: u64,
    /// Entity to preselect
    pub item_id: Option<EntityId>,
}

impl NavigationToken {
    /// Token for a page without a preselected item
    #[must_use]
    pub const fn page(page_id: u64) -> Self {
        Self {
            page_id,
            item_id: None,
        }
    }

    /// Token for a page with a preselected item
    #[must_use]
    pub const fn item(page_id: u64, item_id: EntityId) -> Self {
        Self {
            page_id,
            item_id: Some(item_id),
        }
    }
}

fn parse_id(token: &str, label: &str, digits: &str) -> Result<u64, RouteParseError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RouteParseError::new(
            token,
            format!("{label} id must be an unsigned integer"),
        ));
    }
    digits
        .parse()
        .map_err(|_| RouteParseError::new(token, format!("{label} id is out of range")))
}

impl FromStr for NavigationToken {
    type Err = RouteParseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let rest = token
            .strip_prefix("page:")
            .ok_or_else(|| RouteParseError::new(token, "expected `page:<id>`"))?;
        let (page, item) = match rest.split_once('&') {
            Some((page, item)) => {
                let item = item
                    .strip_prefix("item:")
                    .ok_or_else(|| RouteParseError::new(token, "expected `&item:<id>`"))?;
                (page, Some(item))
            }
            None => (rest, None),
        };

        Ok(Self {
            page_id: parse_id(token, "page", page)?,
            item_id: item.map(|item| parse_id(token, "item", item)).transpose()?,
        })
    }
}

impl fmt::Display for NavigationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:{}", self.page_id)?;
        if let Some(item) = self.item_id {
            write!(f, "&item:{item}")?;
        }
        Ok(())
    }
}
