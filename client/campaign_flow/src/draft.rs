//! # Draft
//!
//! A [`StagedDraft`] is a campaign that has been filled in but not yet
//! created. It lives in [`SessionStorage`] under the keys listed in
//! [`crate::storage`] so a reload or an abandoned payment page does not lose
//! it.
//!
//! The image is either a hosted URL or a local file, never both. A staged
//! file is kept as a base64 `data:` URL and turned back into bytes when the
//! draft is committed.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::DraftError;
use crate::storage::{
    SessionStorage, DRAFT_KEYS, FILE_DATA_KEY, FILE_NAME_KEY, FORM_DATA_KEY, HAS_FILE_KEY,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Text fields of the "create campaign" form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignForm {
    pub title: String,
    pub description: String,
    pub goal_amount: f64,
    pub duration_months: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A locally selected image file.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    /// Encode as `data:<mime>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }

    /// Rebuild a file from a base64 `data:` URL.
    pub fn from_data_url(name: &str, data_url: &str) -> Result<Self, DraftError> {
        let rest = data_url
            .strip_prefix("data:")
            .ok_or_else(|| DraftError::InvalidFileData("not a data URL".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| DraftError::InvalidFileData("missing payload separator".to_string()))?;
        let mime = meta.strip_suffix(";base64").ok_or_else(|| {
            DraftError::InvalidFileData("only base64 data URLs are supported".to_string())
        })?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DraftError::InvalidFileData(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            content_type: if mime.is_empty() {
                DEFAULT_CONTENT_TYPE.to_string()
            } else {
                mime.to_string()
            },
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    File(StagedFile),
}

/// Multi-part body for the remote creation call.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignPayload {
    /// Text parts in submission order.
    pub fields: Vec<(&'static str, String)>,
    /// Binary part sent as `image_file`.
    pub image_file: Option<StagedFile>,
}

impl CampaignPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A campaign waiting for payment before it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedDraft {
    pub form: CampaignForm,
    pub image: Option<ImageSource>,
}

impl StagedDraft {
    pub fn new(form: CampaignForm, image: Option<ImageSource>) -> Self {
        Self { form, image }
    }

    fn validate(&self) -> Result<(), DraftError> {
        if self.form.title.trim().is_empty() {
            return Err(DraftError::Invalid("title is required".to_string()));
        }
        if !(self.form.goal_amount.is_finite() && self.form.goal_amount > 0.0) {
            return Err(DraftError::Invalid(
                "goal amount must be a positive number".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the draft to session storage, replacing any earlier draft.
    pub async fn stage(&self, storage: &dyn SessionStorage) -> Result<(), DraftError> {
        self.validate()?;

        let mut form = self.form.clone();
        match &self.image {
            Some(ImageSource::File(file)) => {
                form.image_url = None;
                storage.set(FILE_DATA_KEY, &file.to_data_url()).await?;
                storage.set(FILE_NAME_KEY, &file.name).await?;
                storage.set(HAS_FILE_KEY, "true").await?;
            }
            Some(ImageSource::Url(url)) => {
                form.image_url = Some(url.clone());
                clear_file(storage).await?;
            }
            None => {
                form.image_url = None;
                clear_file(storage).await?;
            }
        }
        storage
            .set(FORM_DATA_KEY, &serde_json::to_string(&form)?)
            .await?;

        debug!("Staged campaign draft \"{}\"", form.title);
        Ok(())
    }

    /// Read the staged draft back.
    pub async fn load(storage: &dyn SessionStorage) -> Result<Self, DraftError> {
        let raw = storage
            .get(FORM_DATA_KEY)
            .await?
            .ok_or(DraftError::Missing)?;
        let form: CampaignForm = serde_json::from_str(&raw)?;

        let has_file = storage.get(HAS_FILE_KEY).await?.as_deref() == Some("true");
        let image = if has_file {
            let data = non_empty(storage.get(FILE_DATA_KEY).await?);
            let name = non_empty(storage.get(FILE_NAME_KEY).await?);
            match (data, name) {
                (Some(data), Some(name)) => {
                    Some(ImageSource::File(StagedFile::from_data_url(&name, &data)?))
                }
                _ => {
                    warn!("Draft is flagged with a staged file but its data is missing; continuing without an image");
                    None
                }
            }
        } else {
            non_empty(form.image_url.clone()).map(ImageSource::Url)
        };

        Ok(Self { form, image })
    }

    /// Remove every draft key. Only called once the campaign exists remotely.
    pub async fn discard(storage: &dyn SessionStorage) -> Result<(), DraftError> {
        for key in DRAFT_KEYS {
            storage.remove(key).await?;
        }
        Ok(())
    }

    /// Build the creation payload: all text fields plus at most one image.
    pub fn into_payload(self) -> CampaignPayload {
        let form = self.form;
        let mut fields = vec![
            ("title", form.title),
            ("description", form.description),
            ("goal_amount", form.goal_amount.to_string()),
            ("duration_months", form.duration_months.to_string()),
            ("category", form.category.unwrap_or_default()),
            ("story", form.story.unwrap_or_default()),
            ("video_url", form.video_url.unwrap_or_default()),
        ];

        let image_file = match self.image {
            Some(ImageSource::File(file)) => Some(file),
            Some(ImageSource::Url(url)) => {
                fields.push(("image_url", url));
                None
            }
            None => None,
        };

        CampaignPayload { fields, image_file }
    }
}

async fn clear_file(storage: &dyn SessionStorage) -> Result<(), DraftError> {
    storage.set(HAS_FILE_KEY, "false").await?;
    storage.remove(FILE_DATA_KEY).await?;
    storage.remove(FILE_NAME_KEY).await?;
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
