#![allow(dead_code)]

use oxide_query_core::exec::Engine;
use oxide_query_core::query::Insert;
use oxide_query_core::schema::{Column, Table};
use oxide_query_core::types::{Float64, Int64, Text};
use oxide_query_sqlite::SqliteEngine;

/// Artist and Album, with Album referencing Artist.
pub struct Music {
    pub artist: Table,
    pub artist_id: Column<Int64>,
    pub artist_name: Column<Text>,
    pub album: Table,
    pub album_id: Column<Int64>,
    pub album_name: Column<Text>,
    pub album_artist: Column<Int64>,
    pub album_rating: Column<Float64>,
}

pub fn music() -> Music {
    let mut t = Table::builder("Artist");
    let artist_id = t.column("id", Int64).primary_key().add().unwrap();
    let artist_name = t.column("name", Text).not_null().unique().add().unwrap();
    let artist = t.build().unwrap();

    let mut t = Table::builder("Album");
    let album_id = t.column("id", Int64).primary_key().add().unwrap();
    let album_name = t.column("name", Text).not_null().unique().add().unwrap();
    let album_artist = t
        .column("artist_id", Int64)
        .not_null()
        .references(&artist_id)
        .add()
        .unwrap();
    let album_rating = t.column("rating", Float64).add().unwrap();
    let album = t.build().unwrap();

    Music {
        artist,
        artist_id,
        artist_name,
        album,
        album_id,
        album_name,
        album_artist,
        album_rating,
    }
}

pub const ARTISTS: &[(i64, &str)] = &[
    (1, "Led Zeppelin"),
    (2, "Pink Floyd"),
    (3, "Zeppelin Tribute"),
    (4, "Yes"),
];

pub const ALBUMS: &[(i64, &str, i64, Option<f64>)] = &[
    (1, "IV", 1, Some(4.8)),
    (2, "Houses of the Holy", 1, Some(4.2)),
    (3, "Animals", 2, Some(4.5)),
    (4, "The Wall", 2, None),
    (5, "Fragile", 4, Some(3.9)),
];

/// An in-memory database with the music tables created and filled.
pub fn music_db(m: &Music) -> SqliteEngine {
    let engine = SqliteEngine::open_in_memory().unwrap();
    engine
        .create_tables(&[m.album.clone(), m.artist.clone()])
        .unwrap();

    fill_artists(&engine, m);
    fill_albums(&engine, m);
    engine
}

fn fill_artists(engine: &SqliteEngine, m: &Music) {
    let insert = engine
        .compile(
            &Insert::into_table(&m.artist)
                .placeholder(&m.artist_id)
                .placeholder(&m.artist_name)
                .build()
                .unwrap(),
        )
        .unwrap();
    for &(id, name) in ARTISTS {
        let mut args = insert.arguments();
        args.set(0, id).unwrap().set(1, name).unwrap();
        insert.execute(&args).unwrap();
    }
}

fn fill_albums(engine: &SqliteEngine, m: &Music) {
    let insert = engine
        .compile(
            &Insert::into_table(&m.album)
                .placeholder(&m.album_id)
                .placeholder(&m.album_name)
                .placeholder(&m.album_artist)
                .placeholder(&m.album_rating)
                .build()
                .unwrap(),
        )
        .unwrap();
    for &(id, name, artist, rating) in ALBUMS {
        let mut args = insert.arguments();
        args.set(0, id)
            .unwrap()
            .set(1, name)
            .unwrap()
            .set(2, artist)
            .unwrap()
            .set(3, rating)
            .unwrap();
        insert.execute(&args).unwrap();
    }
}
