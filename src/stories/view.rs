//! Maps viewer state to the regions that should be on screen.

use serde::Serialize;
use uuid::Uuid;

use crate::stories::{
    overlay::UploadModal,
    player::{PlaybackState, StoryViewer},
    scroll::ScrollAffordance,
    Earnings, UploadKind,
};

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "region")]
pub enum Region {
    StoryRail {
        left_arrow: bool,
        right_arrow: bool,
    },
    Player {
        story_id: Uuid,
        index: usize,
        progress: f32,
    },
    LoadingIndicator,
    MediaError {
        retry: bool,
    },
    PausedIndicator,
    AnalyticsButton,
    AnalyticsPanel {
        earnings: Earnings,
    },
    UploadModal {
        media_kind: UploadKind,
    },
}

pub fn regions(viewer: &StoryViewer, upload: &UploadModal, rail: &ScrollAffordance) -> Vec<Region> {
    let arrows = rail.arrows();
    let mut out = vec![Region::StoryRail {
        left_arrow: arrows.left,
        right_arrow: arrows.right,
    }];

    if let (Some(session), Some(story)) = (viewer.session(), viewer.current_story()) {
        out.push(Region::Player {
            story_id: story.id,
            index: session.current_index(),
            progress: session.progress(),
        });

        match viewer.state() {
            PlaybackState::Loading => out.push(Region::LoadingIndicator),
            PlaybackState::Errored => out.push(Region::MediaError { retry: true }),
            PlaybackState::Paused if !session.is_analytics_open() => {
                out.push(Region::PausedIndicator)
            }
            _ => {}
        }

        if viewer.analytics_available() {
            out.push(Region::AnalyticsButton);
            if let (true, Some(earnings)) =
                (session.is_analytics_open(), story.metrics.earnings)
            {
                out.push(Region::AnalyticsPanel { earnings });
            }
        }
    }

    if let Some(draft) = upload.draft() {
        out.push(Region::UploadModal {
            media_kind: draft.media_kind,
        });
    }

    out
}
