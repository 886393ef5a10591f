//! Remote media references and the `MediaStore` abstraction.
//!
//! Media (avatars, bulletin covers, activity images) lives outside the
//! database and is addressed by a `public_id`. [`get_or_upload`] is the one
//! entry point the rest of the system uses.

use std::{future::Future, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::Error;

// ─── Category ────────────────────────────────────────────────────────────────

/// The kind of asset being referenced. Each category has a fixed default
/// asset used when no identifier is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MediaCategory {
  Avatar,
  Bulletin,
  Activity,
}

impl MediaCategory {
  pub fn default_public_id(self) -> &'static str {
    match self {
      Self::Avatar => "default-avatar",
      Self::Bulletin => "bulletin-cover",
      Self::Activity => "activity-image",
    }
  }

  pub fn parse(s: &str) -> crate::Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownMediaCategory(s.to_owned()))
  }
}

// ─── Resource ────────────────────────────────────────────────────────────────

/// A stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaResource {
  pub public_id:     String,
  /// File extension without the dot, e.g. `"png"`.
  pub format:        Option<String>,
  /// Bumped on every overwrite.
  pub version:       i64,
  /// `"upload"` for everything stored through this crate.
  #[serde(rename = "type")]
  pub kind:          String,
  /// `"image"` or `"raw"`.
  pub resource_type: String,
  pub etag:          String,
}

/// An asset payload handed to [`MediaStore::upload`].
#[derive(Debug, Clone)]
pub struct MediaUpload {
  pub data:      Vec<u8>,
  /// Target identifier. `None` lets the store choose one.
  pub public_id: Option<String>,
  pub format:    Option<String>,
}

/// Whether `id` is usable as a public id: non-empty path segments of
/// `[A-Za-z0-9_-]` (plus `.` inside a segment), separated by `/`.
pub fn is_valid_public_id(id: &str) -> bool {
  !id.is_empty()
    && id.split('/').all(|seg| {
      !seg.is_empty()
        && !seg.starts_with('.')
        && seg
          .chars()
          .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

/// Reject an upload target that [`is_valid_public_id`] refuses.
pub fn check_public_id(id: &str) -> crate::Result<()> {
  if is_valid_public_id(id) {
    Ok(())
  } else {
    Err(Error::MalformedPublicId(id.to_owned()))
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the asset host.
pub trait MediaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store `upload`, replacing any asset already stored under the same id.
  fn upload(
    &self,
    upload: MediaUpload,
  ) -> impl Future<Output = Result<MediaResource, Self::Error>> + Send + '_;

  /// Look up an asset. `public_id` has already been validated with
  /// [`is_valid_public_id`]. Returns `None` if nothing is stored under it.
  fn resource(
    &self,
    public_id: String,
  ) -> impl Future<Output = Result<Option<MediaResource>, Self::Error>> + Send + '_;
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Upload `file` if given; otherwise resolve `public_id`, falling back to the
/// category default when no id is supplied.
///
/// An unknown or malformed identifier yields `Ok(None)`: callers treat
/// absence as "no media". Only failures of the store itself are errors.
pub async fn get_or_upload<M: MediaStore>(
  store: &M,
  file: Option<Vec<u8>>,
  public_id: Option<String>,
  format: Option<String>,
  category: Option<MediaCategory>,
) -> Result<Option<MediaResource>, M::Error> {
  if let Some(data) = file {
    let resource = store.upload(MediaUpload { data, public_id, format }).await?;
    return Ok(Some(resource));
  }

  let public_id = match (public_id, category) {
    (Some(id), _) => id,
    (None, Some(category)) => category.default_public_id().to_owned(),
    (None, None) => return Ok(None),
  };

  if !is_valid_public_id(&public_id) {
    tracing::debug!(public_id, "malformed media id treated as absent");
    return Ok(None);
  }

  store.resource(public_id).await
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{
      Mutex,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use super::*;

  /// An in-memory host that counts uploads.
  #[derive(Default)]
  struct MemoryMedia {
    assets:  Mutex<HashMap<String, MediaResource>>,
    uploads: AtomicUsize,
  }

  impl MemoryMedia {
    fn with(ids: &[&str]) -> Self {
      let store = Self::default();
      for id in ids {
        store.assets.lock().unwrap().insert(id.to_string(), resource(id, 1, "seed"));
      }
      store
    }
  }

  fn resource(id: &str, version: i64, etag: &str) -> MediaResource {
    MediaResource {
      public_id:     id.to_owned(),
      format:        Some("png".into()),
      version,
      kind:          "upload".into(),
      resource_type: "image".into(),
      etag:          etag.to_owned(),
    }
  }

  impl MediaStore for MemoryMedia {
    type Error = Infallible;

    async fn upload(&self, upload: MediaUpload) -> Result<MediaResource, Infallible> {
      let n = self.uploads.fetch_add(1, Ordering::SeqCst) as i64 + 1;
      let id = upload.public_id.unwrap_or_else(|| format!("generated-{n}"));
      let res = resource(&id, n, &String::from_utf8_lossy(&upload.data));
      self.assets.lock().unwrap().insert(id, res.clone());
      Ok(res)
    }

    async fn resource(&self, public_id: String) -> Result<Option<MediaResource>, Infallible> {
      Ok(self.assets.lock().unwrap().get(&public_id).cloned())
    }
  }

  #[tokio::test]
  async fn file_always_uploads_and_overwrites() {
    let store = MemoryMedia::with(&["avatars/u1"]);

    let res = get_or_upload(&store, Some(b"new".to_vec()), Some("avatars/u1".into()), None, None)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(res.public_id, "avatars/u1");
    assert_eq!(res.etag, "new");

    let again = get_or_upload(&store, None, Some("avatars/u1".into()), None, None)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(again.etag, "new");
    assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn upload_without_id_lets_store_choose() {
    let store = MemoryMedia::default();
    let res = get_or_upload(&store, Some(vec![1]), None, None, Some(MediaCategory::Avatar))
      .await
      .unwrap()
      .unwrap();
    assert_eq!(res.public_id, "generated-1");
  }

  #[tokio::test]
  async fn category_default_substitutes_missing_id() {
    let store = MemoryMedia::with(&["bulletin-cover"]);
    let res = get_or_upload(&store, None, None, None, Some(MediaCategory::Bulletin))
      .await
      .unwrap();
    assert_eq!(res.map(|r| r.public_id).as_deref(), Some("bulletin-cover"));
  }

  #[tokio::test]
  async fn absent_and_malformed_ids_resolve_to_none() {
    let store = MemoryMedia::default();
    assert_eq!(get_or_upload(&store, None, None, None, None).await.unwrap(), None);
    assert_eq!(
      get_or_upload(&store, None, Some("missing".into()), None, None).await.unwrap(),
      None
    );
    assert_eq!(
      get_or_upload(&store, None, Some("../etc/passwd".into()), None, None).await.unwrap(),
      None
    );
    assert_eq!(
      get_or_upload(&store, None, None, None, Some(MediaCategory::Activity)).await.unwrap(),
      None
    );
  }

  #[test]
  fn public_id_validation() {
    assert!(is_valid_public_id("default-avatar"));
    assert!(is_valid_public_id("activities/2024/poster_1.v2"));
    assert!(!is_valid_public_id(""));
    assert!(!is_valid_public_id("/abs"));
    assert!(!is_valid_public_id("a//b"));
    assert!(!is_valid_public_id("a/../b"));
    assert!(!is_valid_public_id("white space"));
  }

  #[test]
  fn upload_targets_are_checked() {
    assert!(check_public_id("avatars/u1").is_ok());
    assert!(matches!(check_public_id("bad id"), Err(Error::MalformedPublicId(id)) if id == "bad id"));
  }

  #[test]
  fn category_parsing() {
    assert_eq!(MediaCategory::parse("avatar").unwrap(), MediaCategory::Avatar);
    assert!(matches!(MediaCategory::parse("banner"), Err(Error::UnknownMediaCategory(_))));
  }
}
