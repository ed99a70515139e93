//! Permissions granted to the bearer of an access token
//!
//! Authorization servers that implement role-based access control report
//! the permissions granted to the bearer in a `permissions` claim, as
//! Auth0 does. Each individual permission uses the syntax of an OAuth2
//! scope token.

use std::{collections::hash_set, fmt, str::FromStr};

use ahash::AHashSet;
use aliri_braid::braid;
use kafejo::{clock::UnixTime, jwt};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An invalid permission
#[derive(Debug, Error)]
pub enum InvalidPermission {
    /// The permission was the empty string
    #[error("permission cannot be empty")]
    EmptyString,
    /// The permission contained an invalid byte
    #[error("invalid permission byte at position {position}: 0x{value:02x}")]
    InvalidByte {
        /// The index in the permission where the invalid byte was found
        position: usize,
        /// The invalid byte value
        value: u8,
    },
}

impl From<std::convert::Infallible> for InvalidPermission {
    #[inline]
    fn from(x: std::convert::Infallible) -> Self {
        match x {}
    }
}

/// A single permission granted to the bearer of an access token,
/// such as `get:drinks-detail`
///
/// Permissions use the syntax of an OAuth2 scope token as defined in
/// [RFC 6749, Section 3.3][RFC6749 3.3]: a permission must be composed
/// of printable ASCII characters excluding ` ` (space), `"` (double
/// quote), and `\` (backslash).
///
///   [RFC6749 3.3]: (https://datatracker.ietf.org/doc/html/rfc6749#section-3.3)
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`Permission`]"
)]
pub struct Permission;

impl aliri_braid::Validator for Permission {
    type Error = InvalidPermission;

    /// Validates that the permission is valid
    ///
    /// A valid permission is non-empty and composed of printable
    /// ASCII characters except ` `, `"`, and `\`.
    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            Err(InvalidPermission::EmptyString)
        } else if let Some((position, &value)) = s
            .as_bytes()
            .iter()
            .enumerate()
            .find(|(_, &b)| b <= 0x20 || b == 0x22 || b == 0x5C || 0x7F <= b)
        {
            Err(InvalidPermission::InvalidByte { position, value })
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum PermissionsDto {
    Array(Vec<Permission>),
    String(String),
}

impl TryFrom<Option<PermissionsDto>> for PermissionSet {
    type Error = InvalidPermission;

    fn try_from(dto: Option<PermissionsDto>) -> Result<Self, Self::Error> {
        if let Some(dto) = dto {
            match dto {
                PermissionsDto::Array(arr) => Ok(arr.into_iter().collect()),
                PermissionsDto::String(s) => Self::try_from(s),
            }
        } else {
            Ok(Self::empty())
        }
    }
}

impl From<PermissionSet> for PermissionsDto {
    fn from(s: PermissionSet) -> Self {
        PermissionsDto::Array(s.0.into_iter().collect())
    }
}

/// A set of permissions defining the access granted to a bearer
///
/// Serialized as an array of strings, matching the form of the
/// `permissions` claim minted by role-based authorization servers.
/// A space-delimited string is also accepted on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "Option<PermissionsDto>", into = "PermissionsDto")]
pub struct PermissionSet(AHashSet<Permission>);

static EMPTY_PERMISSIONS: Lazy<PermissionSet> = Lazy::new(PermissionSet::empty);

impl PermissionSet {
    /// Produces an empty permission set
    #[inline]
    pub fn empty() -> Self {
        Self(AHashSet::new())
    }

    /// A reference to a shared, empty permission set
    #[inline]
    pub fn empty_ref() -> &'static Self {
        &EMPTY_PERMISSIONS
    }

    /// Constructs a new permission set from a single permission
    #[inline]
    pub fn single(permission: Permission) -> Self {
        let mut s = Self::empty();
        s.insert(permission);
        s
    }

    /// Adds an additional permission
    #[inline]
    pub fn and(self, permission: Permission) -> Self {
        let mut s = self;
        s.insert(permission);
        s
    }

    /// Constructs a permission set from an iterator of permissions
    #[inline]
    pub fn from_permissions<I>(permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        Self::from_iter(permissions)
    }

    /// Adds a permission to the set
    #[inline]
    pub fn insert(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Produces an iterator of the permissions in this set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &PermissionRef> {
        (&self).into_iter()
    }

    /// Checks to see whether this set contains all of
    /// the permissions in `subset`.
    #[inline]
    pub fn contains_all(&self, subset: &PermissionSet) -> bool {
        self.0.is_superset(&subset.0)
    }

    /// The number of permissions in the set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether the set contains no permissions
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PermissionSet {
    /// Formats the set as space-delimited permissions
    ///
    /// Iteration order is arbitrary, so two equal sets may display
    /// their permissions in different orders.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            f.write_str(first.as_str())?;
            for next in iter {
                f.write_str(" ")?;
                f.write_str(next.as_str())?;
            }
        }
        Ok(())
    }
}

impl IntoIterator for PermissionSet {
    type Item = Permission;
    type IntoIter = <AHashSet<Permission> as IntoIterator>::IntoIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// An iterator over a set of borrowed permissions
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    iter: hash_set::Iter<'a, Permission>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PermissionRef;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|x| x.as_ref())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a PermissionRef;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Self::IntoIter {
            iter: self.0.iter(),
        }
    }
}

impl<S> Extend<S> for PermissionSet
where
    S: Into<Permission>,
{
    #[inline]
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = S>,
    {
        self.0.extend(iter.into_iter().map(Into::into))
    }
}

impl<S> FromIterator<S> for PermissionSet
where
    S: Into<Permission>,
{
    #[inline]
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
    {
        let mut set = Self::empty();
        set.extend(iter);
        set
    }
}

impl TryFrom<&'_ str> for PermissionSet {
    type Error = InvalidPermission;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.split_whitespace().map(Permission::try_from).collect()
    }
}

impl TryFrom<String> for PermissionSet {
    type Error = InvalidPermission;

    #[inline]
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::try_from(s.as_str())
    }
}

impl FromStr for PermissionSet {
    type Err = InvalidPermission;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

/// A convenience structure for payloads where the user only cares about the
/// granted permissions and other basic claims
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasicClaimsWithPermissions {
    /// The basic claims
    #[serde(flatten)]
    pub basic: jwt::BasicClaims,

    /// The `permissions` claim
    ///
    /// Absent if the authorization server did not include the claim
    /// in the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<PermissionSet>,
}

impl jwt::CoreClaims for BasicClaimsWithPermissions {
    #[inline]
    fn nbf(&self) -> Option<UnixTime> {
        self.basic.nbf()
    }

    #[inline]
    fn exp(&self) -> Option<UnixTime> {
        self.basic.exp()
    }

    #[inline]
    fn aud(&self) -> &jwt::Audiences {
        self.basic.aud()
    }

    #[inline]
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.basic.iss()
    }

    #[inline]
    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.basic.sub()
    }
}

/// Indicates that the type reports the permissions granted to the bearer
pub trait HasPermissions {
    /// The granted permissions
    ///
    /// Returns `None` if the underlying token carried no permissions
    /// claim at all, as distinct from an empty set of permissions.
    fn permissions(&self) -> Option<&PermissionSet>;
}

impl HasPermissions for BasicClaimsWithPermissions {
    #[inline]
    fn permissions(&self) -> Option<&PermissionSet> {
        self.permissions.as_ref()
    }
}

impl HasPermissions for PermissionSet {
    #[inline]
    fn permissions(&self) -> Option<&PermissionSet> {
        Some(self)
    }
}

/// Construct a permission set from a list of static permissions.
///
/// ```
/// use kafejo_oauth2::permissions;
///
/// let set = permissions!["get:drinks-detail", "post:drinks"];
/// assert_eq!(set.len(), 2);
/// ```
///
/// # Panics
///
/// Panics if any of the listed values is not a valid [`Permission`].
#[macro_export]
macro_rules! permissions {
    [$($perm:expr),* $(,)?] => {
        $crate::PermissionSet::from_permissions([
            $($crate::Permission::from_static($perm)),*
        ])
    };
}
