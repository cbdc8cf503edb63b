use tracing::debug;
use validator::Validate;

use crate::{
    config::settings::ViewerIdentity,
    error::AppError,
    media::{self, MediaKind},
    stories::{Role, Story, UploadDraft, UploadKind},
};

/// Whether the earnings panel may be shown for `story`.
///
/// Fans never see it. Everyone else needs an open viewer, a monetized story,
/// and to be the owner, a privileged identity, or a creator.
pub fn analytics_visible(viewer_open: bool, story: Option<&Story>, identity: &ViewerIdentity) -> bool {
    let Some(story) = story else {
        return false;
    };
    if !viewer_open || !story.is_monetized() {
        return false;
    }

    match identity.role {
        Role::Fan => false,
        role => {
            let is_owner = story.user.username == identity.username;
            is_owner || identity.privileged || role.is_creator()
        }
    }
}

/// Upload panel opened from the add-story slot.
#[derive(Debug, Default)]
pub struct UploadModal {
    open: bool,
    draft: UploadDraft,
}

impl UploadModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn draft(&self) -> Option<&UploadDraft> {
        self.open.then_some(&self.draft)
    }

    pub fn open(&mut self) {
        if !self.open {
            self.draft = UploadDraft::default();
            self.open = true;
        }
    }

    pub fn cancel(&mut self) {
        self.open = false;
        self.draft = UploadDraft::default();
    }

    pub fn set_media_kind(&mut self, kind: UploadKind) {
        self.draft.media_kind = kind;
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    /// Picks the draft's media kind from a selected file's declared type.
    /// Stories take photos and videos only.
    pub fn attach(&mut self, mime: &str) -> Result<UploadKind, AppError> {
        if !media::is_accepted(mime) {
            return Err(AppError::UnprocessableEntity(format!(
                "Unsupported media type: {mime}"
            )));
        }
        let kind = match MediaKind::from_mime(mime) {
            Some(MediaKind::Photo) => UploadKind::Photo,
            Some(MediaKind::Video) => UploadKind::Video,
            Some(MediaKind::Audio) | None => {
                return Err(AppError::UnprocessableEntity(format!(
                    "Unsupported story media type: {mime}"
                )))
            }
        };
        self.draft.media_kind = kind;
        Ok(kind)
    }

    /// Validates and hands the draft over, leaving the modal closed and empty.
    /// An invalid draft keeps the modal open for correction.
    pub fn submit(&mut self) -> Result<UploadDraft, AppError> {
        if !self.open {
            return Err(AppError::UnprocessableEntity(
                "Upload modal is not open".to_string(),
            ));
        }
        self.draft.validate()?;

        let draft = std::mem::take(&mut self.draft);
        self.open = false;
        debug!(
            "upload: submitted {} story {:?}",
            MediaKind::from(draft.media_kind).label(),
            draft.title
        );
        Ok(draft)
    }
}
