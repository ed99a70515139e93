use std::{iter, slice, vec};

use thiserror::Error;

use crate::PermissionSet;

/// A policy against which requests are evaluated
pub trait Policy {
    /// The request type evaluated by this policy
    type Request;
    /// The denial produced when this policy rejects a request
    type Denial: std::error::Error;

    /// Evaluates the policy against the request
    ///
    /// # Errors
    ///
    /// Returns a denial if the policy rejects the request.
    fn evaluate(&self, request: &Self::Request) -> Result<(), Self::Denial>;
}

/// Indicates the requester held insufficient permissions to be granted
/// access to a controlled resource
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient permissions")]
pub struct InsufficientPermissions;

/// An access policy based on granted permissions
///
/// This access policy takes the form of alternatives around required
/// permission sets. This policy will allow access if any of the
/// alternatives would allow access. If the policy contains no
/// alternatives, the default effect is to deny access.
///
/// # Examples
///
/// ## Deny all requests
/// ```
/// use kafejo_oauth2::{permissions, PermissionPolicy, Policy};
///
/// let policy = PermissionPolicy::deny_all();
///
/// let request = permissions!["post:drinks"];
/// assert!(policy.evaluate(&request).is_err());
/// ```
///
/// ## Allow any request
/// ```
/// use kafejo_oauth2::{PermissionPolicy, PermissionSet, Policy};
///
/// let policy = PermissionPolicy::allow_any();
///
/// let request = PermissionSet::empty();
/// assert!(policy.evaluate(&request).is_ok());
/// ```
///
/// ## Allow requests holding a single permission
/// ```
/// use kafejo_oauth2::{permissions, PermissionPolicy, Policy};
///
/// let policy = PermissionPolicy::allow_one(permissions!["post:drinks"]);
///
/// let request = permissions!["post:drinks", "patch:drinks"];
/// assert!(policy.evaluate(&request).is_ok());
///
/// let insufficient = permissions!["patch:drinks"];
/// assert!(policy.evaluate(&insufficient).is_err());
/// ```
///
/// ## Allow requests with multiple potential sets of permissions
/// ```
/// use kafejo_oauth2::{permissions, PermissionPolicy, Policy};
///
/// let mut policy = PermissionPolicy::deny_all();
/// policy.allow(permissions!["admin"]);
/// policy.allow(permissions!["special", "post:drinks"]);
///
/// let admin_request = permissions!["admin"];
/// assert!(policy.evaluate(&admin_request).is_ok());
///
/// let post_request = permissions!["post:drinks"];
/// assert!(policy.evaluate(&post_request).is_err());
///
/// let special_post_request = permissions!["special", "post:drinks"];
/// assert!(policy.evaluate(&special_post_request).is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct PermissionPolicy {
    inner: PermissionPolicyInner,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PermissionPolicyInner {
    DenyAll,
    AllowAny,
    AllowOne(PermissionSet),
    AllowMany(Vec<PermissionSet>),
}

impl Default for PermissionPolicy {
    #[inline]
    fn default() -> Self {
        Self::deny_all()
    }
}

impl PermissionPolicy {
    /// Constructs a policy that has no permissible alternatives
    ///
    /// By default, this policy will deny all requests
    #[inline]
    pub const fn deny_all() -> Self {
        Self {
            inner: PermissionPolicyInner::DenyAll,
        }
    }

    /// Constructs a policy that does not require any permissions (allow)
    #[inline]
    pub const fn allow_any() -> Self {
        Self {
            inner: PermissionPolicyInner::AllowAny,
        }
    }

    /// Constructs a policy that requires this set of permissions
    #[inline]
    pub const fn allow_one(permissions: PermissionSet) -> Self {
        Self {
            inner: PermissionPolicyInner::AllowOne(permissions),
        }
    }

    /// Add an alternate allowable set of permissions
    #[inline]
    pub fn or_allow(self, permissions: PermissionSet) -> Self {
        if permissions.is_empty() {
            let mut this = self;
            this.inner = PermissionPolicyInner::AllowAny;
            this
        } else {
            match self.inner {
                PermissionPolicyInner::AllowAny => Self::allow_any(),
                PermissionPolicyInner::DenyAll => Self::allow_one(permissions),
                PermissionPolicyInner::AllowOne(existing) => Self {
                    inner: PermissionPolicyInner::AllowMany(vec![existing, permissions]),
                },
                PermissionPolicyInner::AllowMany(mut sets) => {
                    sets.push(permissions);
                    Self {
                        inner: PermissionPolicyInner::AllowMany(sets),
                    }
                }
            }
        }
    }

    /// Add an alternate allowable set of permissions
    pub fn allow(&mut self, permissions: PermissionSet) {
        let this = std::mem::take(self);
        *self = this.or_allow(permissions);
    }

    /// Constructs a policy that requires this set of permissions from a string
    ///
    /// Multiple permissions can be required by separating them with spaces.
    ///
    /// # Panics
    ///
    /// This function will panic if the provided string is not a valid
    /// [`PermissionSet`][crate::PermissionSet].
    pub fn allow_one_from_static(permissions: &'static str) -> Self {
        match permissions.parse::<PermissionSet>() {
            Ok(permissions) => Self::allow_one(permissions),
            Err(err) => panic!("{}: permissions = {}", err, permissions),
        }
    }

    /// Add an alternate allowable set of permissions from a string
    ///
    /// # Panics
    ///
    /// This function will panic if the provided string is not a valid
    /// [`PermissionSet`][crate::PermissionSet].
    pub fn or_allow_from_static(self, permissions: &'static str) -> Self {
        match permissions.parse::<PermissionSet>() {
            Ok(permissions) => self.or_allow(permissions),
            Err(err) => panic!("{}: permissions = {}", err, permissions),
        }
    }

    /// Add an alternate allowable set of permissions from a string
    ///
    /// # Panics
    ///
    /// This function will panic if the provided string is not a valid
    /// [`PermissionSet`][crate::PermissionSet].
    pub fn allow_from_static(&mut self, permissions: &'static str) {
        match permissions.parse::<PermissionSet>() {
            Ok(permissions) => self.allow(permissions),
            Err(err) => panic!("{}: permissions = {}", err, permissions),
        }
    }

    const fn is_allow_all(&self) -> bool {
        matches!(self.inner, PermissionPolicyInner::AllowAny)
    }
}

impl Policy for PermissionPolicy {
    type Request = PermissionSet;
    type Denial = InsufficientPermissions;

    fn evaluate(&self, held: &Self::Request) -> Result<(), Self::Denial> {
        let allowed = self.into_iter().any(|req| held.contains_all(req));

        if allowed {
            Ok(())
        } else {
            Err(InsufficientPermissions)
        }
    }
}

impl IntoIterator for PermissionPolicy {
    type Item = PermissionSet;
    type IntoIter = IntoIter;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        let inner = match self.inner {
            PermissionPolicyInner::DenyAll => IntoIterInner::Empty,
            PermissionPolicyInner::AllowAny => IntoIterInner::One(iter::once(PermissionSet::empty())),
            PermissionPolicyInner::AllowOne(set) => IntoIterInner::One(iter::once(set)),
            PermissionPolicyInner::AllowMany(sets) => IntoIterInner::Many(sets.into_iter()),
        };
        IntoIter { inner }
    }
}

/// An iterator over the permission set alternatives in a [`PermissionPolicy`]
#[derive(Debug)]
pub struct IntoIter {
    inner: IntoIterInner,
}

#[derive(Debug)]
enum IntoIterInner {
    Empty,
    One(iter::Once<PermissionSet>),
    Many(vec::IntoIter<PermissionSet>),
}

impl Iterator for IntoIter {
    type Item = PermissionSet;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IntoIterInner::Empty => None,
            IntoIterInner::One(iter) => iter.next(),
            IntoIterInner::Many(iter) => iter.next(),
        }
    }
}

/// An iterator over a set of borrowed permission set alternatives
#[derive(Clone, Debug)]
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

#[derive(Clone, Debug)]
enum IterInner<'a> {
    Empty,
    One(iter::Once<&'a PermissionSet>),
    Many(slice::Iter<'a, PermissionSet>),
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PermissionSet;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            IterInner::Empty => None,
            IterInner::One(iter) => iter.next(),
            IterInner::Many(iter) => iter.next(),
        }
    }
}

impl<'a> IntoIterator for &'a PermissionPolicy {
    type Item = &'a PermissionSet;
    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: match &self.inner {
                PermissionPolicyInner::DenyAll => IterInner::Empty,
                PermissionPolicyInner::AllowAny => {
                    IterInner::One(iter::once(PermissionSet::empty_ref()))
                }
                PermissionPolicyInner::AllowOne(set) => IterInner::One(iter::once(set)),
                PermissionPolicyInner::AllowMany(sets) => IterInner::Many(sets.iter()),
            },
        }
    }
}

impl Extend<PermissionSet> for PermissionPolicy {
    #[inline]
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = PermissionSet>,
    {
        for permissions in iter {
            self.allow(permissions);

            if self.is_allow_all() {
                break;
            }
        }
    }
}

impl FromIterator<PermissionSet> for PermissionPolicy {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = PermissionSet>,
    {
        let mut set = Self::deny_all();
        set.extend(iter);
        set
    }
}

impl From<PermissionSet> for PermissionPolicy {
    #[inline]
    fn from(permissions: PermissionSet) -> Self {
        Self::allow_one(permissions)
    }
}

/// Construct a policy from a list of permission set alternatives.
///
/// For more information about how the alternatives are evaluated, see
/// [`PermissionPolicy`].
///
/// ```
/// use kafejo_oauth2::{permissions, policy};
///
/// let policy = policy![
///     permissions!["admin"],
///     permissions!["special", "post:drinks"],
/// ];
/// ```
///
/// This is equivalent to the following:
///
/// ```
/// use kafejo_oauth2::{permissions, PermissionPolicy};
///
/// let policy = PermissionPolicy::deny_all()
///     .or_allow(permissions!["admin"])
///     .or_allow(permissions!["special", "post:drinks"]);
/// ```
#[macro_export]
macro_rules! policy {
    ($($permissions:expr),* $(,)?) => {
        $crate::PermissionPolicy::deny_all()
        $(
            .or_allow($permissions)
        )*
    };
}
