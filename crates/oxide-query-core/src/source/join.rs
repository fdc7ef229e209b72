use std::sync::Arc;

use super::{ColumnSet, Source};
use crate::error::SchemaError;
use crate::expr::{combine, CompareOp, Expr, LogicalOp, Predicate};
use crate::render::RenderCtx;
use crate::schema::{ColumnRef, SetId};

/// Join operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN ... ON`.
    Inner,
    /// `LEFT JOIN ... ON`.
    Left,
    /// `CROSS JOIN`.
    Cross,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug)]
struct JoinDef {
    id: SetId,
    name: String,
    kind: JoinKind,
    left: Source,
    right: Source,
    on: Option<Expr>,
    columns: Vec<ColumnRef>,
    errors: Vec<SchemaError>,
}

/// Two sources joined together.
///
/// The columns of a join are the columns of the left side followed by those
/// of the right side, unchanged. Chaining associates to the left:
/// `a.inner_join(b, ..).inner_join(c, ..)` is `(a JOIN b) JOIN c`.
///
/// The join condition may only reference columns of the two sides; any
/// other column is reported when the enclosing statement is built.
#[derive(Debug, Clone)]
pub struct Join(Arc<JoinDef>);

impl Join {
    fn new(kind: JoinKind, left: Source, right: Source, on: Option<Expr>) -> Self {
        let columns: Vec<ColumnRef> = left
            .column_refs()
            .iter()
            .chain(right.column_refs())
            .cloned()
            .collect();
        let name = format!("{} {} {}", left.set_name(), kind.as_sql(), right.set_name());
        let mut errors = Vec::new();
        if let Some(on) = &on {
            on.for_each_column(&mut |column: &ColumnRef| {
                if !columns.iter().any(|c| c.key() == column.key()) {
                    errors.push(SchemaError::ColumnNotInSet {
                        column: column.to_string(),
                        set: name.clone(),
                    });
                }
            });
        }
        Self(Arc::new(JoinDef {
            id: SetId::next(),
            name,
            kind,
            left,
            right,
            on,
            columns,
            errors,
        }))
    }

    /// `left INNER JOIN right ON on`.
    #[must_use]
    pub fn inner(left: impl Into<Source>, right: impl Into<Source>, on: Predicate) -> Self {
        Self::new(JoinKind::Inner, left.into(), right.into(), Some(on.expr))
    }

    /// `left LEFT JOIN right ON on`.
    #[must_use]
    pub fn left(left: impl Into<Source>, right: impl Into<Source>, on: Predicate) -> Self {
        Self::new(JoinKind::Left, left.into(), right.into(), Some(on.expr))
    }

    /// `left CROSS JOIN right`.
    #[must_use]
    pub fn cross(left: impl Into<Source>, right: impl Into<Source>) -> Self {
        Self::new(JoinKind::Cross, left.into(), right.into(), None)
    }

    /// Inner join on equality of every column name both sides share.
    ///
    /// Without a shared name this is a cross join.
    #[must_use]
    pub fn natural(left: impl Into<Source>, right: impl Into<Source>) -> Self {
        let (left, right) = (left.into(), right.into());
        let pairs: Vec<Expr> = left
            .column_refs()
            .iter()
            .filter_map(|l| {
                right
                    .column_refs()
                    .iter()
                    .find(|r| r.name() == l.name())
                    .map(|r| Expr::Compare {
                        op: CompareOp::Eq,
                        lhs: Box::new(Expr::Column(l.clone())),
                        rhs: Box::new(Expr::Column(r.clone())),
                    })
            })
            .collect();
        let on = pairs
            .into_iter()
            .reduce(|acc, pair| combine(LogicalOp::And, acc, pair));
        match on {
            Some(on) => Self::new(JoinKind::Inner, left, right, Some(on)),
            None => Self::new(JoinKind::Cross, left, right, None),
        }
    }

    /// Inner-joins another source onto this join.
    #[must_use]
    pub fn inner_join(self, right: impl Into<Source>, on: Predicate) -> Self {
        Self::inner(self, right, on)
    }

    /// Left-joins another source onto this join.
    #[must_use]
    pub fn left_join(self, right: impl Into<Source>, on: Predicate) -> Self {
        Self::left(self, right, on)
    }

    /// Cross-joins another source onto this join.
    #[must_use]
    pub fn cross_join(self, right: impl Into<Source>) -> Self {
        Self::cross(self, right)
    }

    /// Natural-joins another source onto this join.
    #[must_use]
    pub fn natural_join(self, right: impl Into<Source>) -> Self {
        Self::natural(self, right)
    }

    /// Returns the join operator.
    #[must_use]
    pub fn kind(&self) -> JoinKind {
        self.0.kind
    }

    pub(super) fn render(&self, ctx: &mut RenderCtx<'_>, out: &mut String) {
        for error in &self.0.errors {
            ctx.defer(error.clone());
        }
        self.0.left.render(ctx, out);
        out.push(' ');
        out.push_str(self.0.kind.as_sql());
        out.push(' ');
        if matches!(self.0.right, Source::Join(_)) {
            out.push('(');
            self.0.right.render(ctx, out);
            out.push(')');
        } else {
            self.0.right.render(ctx, out);
        }
        if let Some(on) = &self.0.on {
            out.push_str(" ON ");
            on.render(ctx, out);
        }
    }
}

impl ColumnSet for Join {
    fn set_id(&self) -> SetId {
        self.0.id
    }

    fn set_name(&self) -> &str {
        &self.0.name
    }

    fn column_refs(&self) -> &[ColumnRef] {
        &self.0.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderOptions;
    use crate::schema::{Column, Table};
    use crate::source::Alias;
    use crate::types::{Int64, Text};

    struct Fixture {
        artist: Table,
        artist_id: Column<Int64>,
        album: Table,
        album_artist: Column<Int64>,
        track: Table,
        track_album: Column<Int64>,
        album_id: Column<Int64>,
    }

    fn fixture() -> Fixture {
        let mut t = Table::builder("Artist");
        let artist_id = t.column("id", Int64).primary_key().add().unwrap();
        t.column("name", Text).add().unwrap();
        let artist = t.build().unwrap();

        let mut t = Table::builder("Album");
        let album_id = t.column("album_id", Int64).primary_key().add().unwrap();
        let album_artist = t.column("artist_id", Int64).add().unwrap();
        let album = t.build().unwrap();

        let mut t = Table::builder("Track");
        t.column("track_id", Int64).primary_key().add().unwrap();
        let track_album = t.column("album_id", Int64).add().unwrap();
        let track = t.build().unwrap();

        Fixture {
            artist,
            artist_id,
            album,
            album_artist,
            track,
            track_album,
            album_id,
        }
    }

    fn render(join: &Join) -> String {
        let options = RenderOptions::default();
        let mut ctx = RenderCtx::new(&options);
        let mut out = String::new();
        join.render(&mut ctx, &mut out);
        out
    }

    #[test]
    fn test_chained_joins_associate_left() {
        let f = fixture();
        let join = Join::inner(&f.artist, &f.album, f.artist_id.eq(&f.album_artist))
            .left_join(&f.track, f.track_album.eq(&f.album_id));
        assert_eq!(
            render(&join),
            "Artist INNER JOIN Album ON Artist.id = Album.artist_id \
             LEFT JOIN Track ON Track.album_id = Album.album_id"
        );
        assert_eq!(join.column_refs().len(), 6);
        assert!(join.contains(f.artist_id.key()));
        assert!(join.contains(f.track_album.key()));
    }

    #[test]
    fn test_join_on_the_right_is_parenthesised() {
        let f = fixture();
        let inner = Join::inner(&f.album, &f.track, f.album_id.eq(&f.track_album));
        let join = Join::inner(&f.artist, inner, f.artist_id.eq(&f.album_artist));
        assert_eq!(
            render(&join),
            "Artist INNER JOIN (Album INNER JOIN Track ON Album.album_id = Track.album_id) \
             ON Artist.id = Album.artist_id"
        );
    }

    #[test]
    fn test_natural_join_uses_shared_names() {
        let f = fixture();
        assert_eq!(
            render(&Join::natural(&f.album, &f.track)),
            "Album INNER JOIN Track ON Album.album_id = Track.album_id"
        );
        let a = Alias::new(&f.artist, "a").unwrap();
        let natural = Join::natural(&f.track, a);
        assert_eq!(natural.kind(), JoinKind::Cross);
        assert_eq!(render(&natural), "Track CROSS JOIN Artist AS a");
    }

    #[test]
    fn test_condition_must_reference_both_sides() {
        let f = fixture();
        let mut t = Table::builder("Label");
        let label_id = t.column("id", Int64).primary_key().add().unwrap();
        let _label = t.build().unwrap();

        let join = Join::inner(&f.artist, &f.album, f.artist_id.eq(&label_id));
        assert_eq!(
            join.0.errors,
            [SchemaError::ColumnNotInSet {
                column: String::from("Label.id"),
                set: String::from("Artist INNER JOIN Album"),
            }]
        );
        let chained = Join::inner(&f.artist, &f.album, f.artist_id.eq(&f.album_artist))
            .left_join(&f.track, f.track_album.eq(&f.album_id));
        assert!(chained.0.errors.is_empty());
    }
}
