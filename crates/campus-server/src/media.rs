//! Directory-backed [`MediaStore`].
//!
//! Each asset lives at `<root>/<public_id>` with its metadata in a
//! `<root>/<public_id>@meta.json` sidecar. `@` never appears in a valid public
//! id, so a sidecar can't shadow an asset. Uploads overwrite in place and bump
//! the version; the etag is the SHA-256 of the content.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use campus_core::media::{MediaResource, MediaStore, MediaUpload, is_valid_public_id};
use sha2::{Digest, Sha256};
use tokio::{fs, sync::Mutex};
use tracing::debug;
use uuid::Uuid;

const META_SUFFIX: &str = "@meta.json";

const IMAGE_FORMATS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

#[derive(Debug, thiserror::Error)]
pub enum FsMediaError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("corrupt metadata: {0}")]
  Metadata(#[from] serde_json::Error),

  #[error("malformed public id: {0:?}")]
  MalformedPublicId(String),
}

pub struct FsMediaStore {
  root:  PathBuf,
  // Serialises uploads so versions are bumped one at a time.
  write: Mutex<()>,
}

impl FsMediaStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into(), write: Mutex::new(()) }
  }

  pub fn root(&self) -> &Path { &self.root }

  fn asset_path(&self, public_id: &str) -> PathBuf { self.root.join(public_id) }

  fn meta_path(&self, public_id: &str) -> PathBuf {
    self.root.join(format!("{public_id}{META_SUFFIX}"))
  }

  async fn read_meta(&self, public_id: &str) -> Result<Option<MediaResource>, FsMediaError> {
    match fs::read(self.meta_path(public_id)).await {
      Ok(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

fn resource_type(format: Option<&str>) -> &'static str {
  match format {
    Some(f) if IMAGE_FORMATS.contains(&f) => "image",
    _ => "raw",
  }
}

impl MediaStore for FsMediaStore {
  type Error = FsMediaError;

  async fn upload(&self, upload: MediaUpload) -> Result<MediaResource, FsMediaError> {
    let public_id = upload
      .public_id
      .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    if !is_valid_public_id(&public_id) {
      return Err(FsMediaError::MalformedPublicId(public_id));
    }

    let _guard = self.write.lock().await;

    let path = self.asset_path(&public_id);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let version = match self.read_meta(&public_id).await? {
      Some(previous) => previous.version + 1,
      None => 1,
    };

    fs::write(&path, &upload.data).await?;

    let resource = MediaResource {
      etag: hex::encode(Sha256::digest(&upload.data)),
      resource_type: resource_type(upload.format.as_deref()).to_owned(),
      kind: "upload".to_owned(),
      version,
      format: upload.format,
      public_id,
    };
    fs::write(self.meta_path(&resource.public_id), serde_json::to_vec_pretty(&resource)?).await?;

    debug!(public_id = %resource.public_id, version, "media written");
    Ok(resource)
  }

  async fn resource(&self, public_id: String) -> Result<Option<MediaResource>, FsMediaError> {
    if !is_valid_public_id(&public_id) {
      return Ok(None);
    }
    self.read_meta(&public_id).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A fresh directory under the system temp dir.
  fn scratch() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("campus-media-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  fn upload(data: &[u8], public_id: Option<&str>, format: Option<&str>) -> MediaUpload {
    MediaUpload {
      data:      data.to_vec(),
      public_id: public_id.map(str::to_owned),
      format:    format.map(str::to_owned),
    }
  }

  #[tokio::test]
  async fn upload_writes_asset_and_sidecar() {
    let dir = scratch();
    let store = FsMediaStore::new(&dir);

    let res = store
      .upload(upload(b"hello", Some("avatars/u1"), Some("png")))
      .await
      .unwrap();
    assert_eq!(res.public_id, "avatars/u1");
    assert_eq!(res.version, 1);
    assert_eq!(res.kind, "upload");
    assert_eq!(res.resource_type, "image");
    assert_eq!(
      res.etag,
      "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(std::fs::read(dir.join("avatars/u1")).unwrap(), b"hello");
    assert!(dir.join("avatars/u1@meta.json").exists());

    let found = store.resource("avatars/u1".into()).await.unwrap();
    assert_eq!(found, Some(res));

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[tokio::test]
  async fn overwrite_bumps_version() {
    let dir = scratch();
    let store = FsMediaStore::new(&dir);

    let first = store.upload(upload(b"one", Some("cover"), None)).await.unwrap();
    let second = store.upload(upload(b"two", Some("cover"), None)).await.unwrap();
    assert_eq!(second.version, first.version + 1);
    assert_ne!(second.etag, first.etag);
    assert_eq!(second.resource_type, "raw");
    assert_eq!(std::fs::read(dir.join("cover")).unwrap(), b"two");

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[tokio::test]
  async fn missing_id_is_generated() {
    let dir = scratch();
    let store = FsMediaStore::new(&dir);

    let res = store.upload(upload(b"x", None, Some("pdf"))).await.unwrap();
    assert_eq!(res.public_id.len(), 32);
    assert!(store.resource(res.public_id.clone()).await.unwrap().is_some());

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[tokio::test]
  async fn unknown_and_malformed_ids() {
    let dir = scratch();
    let store = FsMediaStore::new(&dir);

    assert_eq!(store.resource("nothing-here".into()).await.unwrap(), None);
    assert_eq!(store.resource("../escape".into()).await.unwrap(), None);
    assert!(matches!(
      store.upload(upload(b"x", Some("../escape"), None)).await,
      Err(FsMediaError::MalformedPublicId(_))
    ));
    assert_eq!(store.resource("u1@meta.json".into()).await.unwrap(), None);

    // Dotted names are ordinary assets.
    let res = store.upload(upload(b"x", Some("a.meta.json"), None)).await.unwrap();
    assert_eq!(store.resource("a.meta.json".into()).await.unwrap(), Some(res));

    std::fs::remove_dir_all(&dir).unwrap();
  }
}
