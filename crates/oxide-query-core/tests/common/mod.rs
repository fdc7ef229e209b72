#![allow(dead_code)]

use oxide_query_core::schema::{Column, ForeignKeyAction, Table};
use oxide_query_core::types::{Bool, Float64, Int64, Text};

/// Artist, Album and Track, each referencing the previous one.
pub struct Catalog {
    pub artist: Table,
    pub artist_id: Column<Int64>,
    pub artist_name: Column<Text>,
    pub album: Table,
    pub album_id: Column<Int64>,
    pub album_title: Column<Text>,
    pub album_artist: Column<Int64>,
    pub track: Table,
    pub track_id: Column<Int64>,
    pub track_album: Column<Int64>,
    pub track_title: Column<Text>,
    pub track_seconds: Column<Int64>,
    pub track_rating: Column<Float64>,
    pub track_explicit: Column<Bool>,
}

pub fn catalog() -> Catalog {
    let mut t = Table::builder("Artist");
    let artist_id = t.column("id", Int64).primary_key().auto_increment().add().unwrap();
    let artist_name = t.column("name", Text).not_null().unique().add().unwrap();
    let artist = t.build().unwrap();

    let mut t = Table::builder("Album");
    let album_id = t.column("id", Int64).primary_key().add().unwrap();
    let album_title = t.column("title", Text).not_null().add().unwrap();
    let album_artist = t
        .column("artist_id", Int64)
        .not_null()
        .references(&artist_id)
        .on_delete(ForeignKeyAction::Cascade)
        .add()
        .unwrap();
    let album = t.build().unwrap();

    let mut t = Table::builder("Track");
    let track_id = t.column("id", Int64).primary_key().add().unwrap();
    let track_album = t
        .column("album_id", Int64)
        .not_null()
        .references(&album_id)
        .add()
        .unwrap();
    let track_title = t.column("title", Text).not_null().add().unwrap();
    let track_seconds = t.column("seconds", Int64).not_null().add().unwrap();
    let track_rating = t.column("rating", Float64).add().unwrap();
    let track_explicit = t
        .column("explicit", Bool)
        .not_null()
        .default_value(false)
        .add()
        .unwrap();
    let track = t.build().unwrap();

    Catalog {
        artist,
        artist_id,
        artist_name,
        album,
        album_id,
        album_title,
        album_artist,
        track,
        track_id,
        track_album,
        track_title,
        track_seconds,
        track_rating,
        track_explicit,
    }
}
