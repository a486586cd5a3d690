//! Per-entity batch queries against the movie catalog schema
//!
//! Each query takes two binds: `$1` the exclusive lower bound on `modified`
//! and `$2` the batch size. Rows come back ordered by ascending `modified`
//! and projected to JSON with `row_to_json`, so the reader stays agnostic of
//! entity shapes. Relation lists on films use the `"<id>: <name>"` encoding
//! that the transformers parse back apart.

/// Films with their genre and per-role person lists.
pub const LOAD_FILMS: &str = r#"
SELECT row_to_json(batch)
FROM (
    SELECT
        fw.id,
        fw.title,
        fw.description,
        fw.rating,
        fw.type,
        fw.created,
        fw.modified,
        fw.viewing_permission,
        COALESCE(array_agg(DISTINCT g.id || ': ' || g.name)
                 FILTER (WHERE g.id IS NOT NULL), '{}') AS genres,
        COALESCE(array_agg(DISTINCT p.id || ': ' || p.full_name)
                 FILTER (WHERE pfw.role = 'actor'), '{}') AS actors,
        COALESCE(array_agg(DISTINCT p.id || ': ' || p.full_name)
                 FILTER (WHERE pfw.role = 'director'), '{}') AS directors,
        COALESCE(array_agg(DISTINCT p.id || ': ' || p.full_name)
                 FILTER (WHERE pfw.role = 'writer'), '{}') AS writers
    FROM content.film_work fw
    LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
    LEFT JOIN content.genre g ON g.id = gfw.genre_id
    LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
    LEFT JOIN content.person p ON p.id = pfw.person_id
    WHERE fw.modified > $1
    GROUP BY fw.id
    ORDER BY fw.modified
    LIMIT $2
) AS batch
"#;

/// Genres, flat.
pub const LOAD_GENRES: &str = r#"
SELECT row_to_json(batch)
FROM (
    SELECT
        g.id,
        g.name,
        g.description,
        g.created,
        g.modified
    FROM content.genre g
    WHERE g.modified > $1
    ORDER BY g.modified
    LIMIT $2
) AS batch
"#;

/// Persons with their film credits (roles aggregated per film).
pub const LOAD_PERSONS: &str = r#"
SELECT row_to_json(batch)
FROM (
    SELECT
        p.id,
        p.full_name,
        p.modified,
        COALESCE(credits.films, '[]'::json) AS films
    FROM content.person p
    LEFT JOIN LATERAL (
        SELECT json_agg(json_build_object(
            'id', fw.id,
            'title', fw.title,
            'imdb_rating', fw.rating,
            'roles', fw.roles
        )) AS films
        FROM (
            SELECT fw.id, fw.title, fw.rating, array_agg(DISTINCT pfw.role) AS roles
            FROM content.person_film_work pfw
            JOIN content.film_work fw ON fw.id = pfw.film_work_id
            WHERE pfw.person_id = p.id
            GROUP BY fw.id, fw.title, fw.rating
        ) fw
    ) credits ON TRUE
    WHERE p.modified > $1
    ORDER BY p.modified
    LIMIT $2
) AS batch
"#;
