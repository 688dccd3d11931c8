use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub artists: Json,
    pub album: Option<String>,
    pub duration_ms: Option<i32>,
    pub release_date: Option<DateTimeWithTimeZone>,
    pub isrc: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::track_mapping::Entity")]
    TrackMapping,
    #[sea_orm(has_many = "super::track_metric::Entity")]
    TrackMetric,
    #[sea_orm(has_many = "super::track_like::Entity")]
    TrackLike,
    #[sea_orm(has_many = "super::track_play::Entity")]
    TrackPlay,
    #[sea_orm(has_many = "super::playlist_track::Entity")]
    PlaylistTrack,
}

impl Related<super::track_mapping::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackMapping.def()
    }
}

impl Related<super::track_metric::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackMetric.def()
    }
}

impl Related<super::track_like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackLike.def()
    }
}

impl Related<super::track_play::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrackPlay.def()
    }
}

impl Related<super::playlist_track::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaylistTrack.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
