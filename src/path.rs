use zbus::zvariant::OwnedObjectPath;

use crate::error::{Error, Result};

/// Derives the object path an application is published at from its id.
///
/// `a.b.c` becomes `/a/b/c`: a `/` is prefixed and every `.` is replaced with `/`. No other
/// normalization is performed; the id is assumed to already be a valid bus name.
pub fn application_path_from_id(appid: &str) -> Result<OwnedObjectPath> {
    let mut path = String::with_capacity(appid.len() + 1);
    path.push('/');
    for c in appid.chars() {
        path.push(if c == '.' { '/' } else { c });
    }

    OwnedObjectPath::try_from(path.as_str())
        .map_err(|_| Error::InvalidAppId(appid.to_string()))
}
