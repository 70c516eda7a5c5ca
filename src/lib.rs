/*! # `kittygifs`

The catalogue core of a gif bookmarking service.

## Purpose

Users save gifs (by url) with tags, a note and, optionally, a group that
limits who can see them. This crate answers searches over that catalogue
and keeps its tag taxonomy in shape.

Sessions, HTTP and fetching Tenor pages live elsewhere. By the time a call
reaches this crate, the caller is either anonymous or an [`Identity`](models::identity::Identity).

## Layout

- [`search`]: the query language, group checks, and paged execution.
- [`jobs`]: tag counting and implication backfill.
- [`models`]: gifs, tags, tag categories, users, and their notification inbox.
- [`validate`]: write-path checks.
- [`database`] and [`config`]: plumbing.
*/

pub mod config;
pub mod database;
pub mod error;
pub mod jobs;
pub mod models;
pub mod search;
pub mod validate;
