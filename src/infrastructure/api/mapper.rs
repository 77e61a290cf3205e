// src/infrastructure/api/mapper.rs
//! Conversions between domain entities and wire DTOs.
//!
//! All conversions are pure field projections: no I/O, no validation, no
//! failure. Invalid tag strings coming off the wire are dropped rather than
//! rejected, so `*_from_dto` stays total.

use crate::domain::bookmark::Bookmark;
use crate::domain::collection::{AccessLevel, Collection, ShareSettings};
use crate::domain::tag::Tag;
use crate::infrastructure::api::dto::{
    BookmarkDto, BookmarkRequest, CollectionDto, CollectionRequest, SharingRequest,
};

/// Build the create/update request body for a bookmark.
///
/// Not carried: identifiers, timestamps, counters, sync bookkeeping, and the
/// favorite/archived flags (those travel through the patch endpoints).
pub fn bookmark_to_request(bookmark: &Bookmark) -> BookmarkRequest {
    BookmarkRequest {
        collection_id: bookmark.collection_id,
        title: bookmark.title.clone(),
        url: bookmark.url.clone(),
        description: bookmark.description.clone(),
        tags: Tag::to_list(&bookmark.tags),
    }
}

/// Build a domain bookmark from a server row.
///
/// The server copy is by definition synced, so the shadow flags start equal
/// to the live flags and `is_local_id` is cleared. Not carried by the DTO:
/// `is_deleted` (the server never returns tombstones).
pub fn bookmark_from_dto(dto: BookmarkDto) -> Bookmark {
    Bookmark {
        id: dto.id,
        collection_id: dto.collection_id,
        title: dto.title,
        url: dto.url,
        description: dto.description,
        favicon_url: dto.favicon_url,
        image_url: dto.image_url,
        is_favorite: dto.is_favorite,
        is_archived: dto.is_archived,
        server_is_favorite: dto.is_favorite,
        server_is_archived: dto.is_archived,
        tags: Tag::from_list(&dto.tags),
        created_at: dto.created_at,
        updated_at: dto.updated_at,
        last_opened: dto.last_opened,
        open_count: dto.open_count,
        is_synced: true,
        is_deleted: false,
        is_local_id: false,
    }
}

/// Build the create/update request body for a collection.
///
/// Not carried: identifiers, timestamps, the item count (server-computed),
/// share URL and expiry (server-assigned), and sync bookkeeping.
pub fn collection_to_request(collection: &Collection) -> CollectionRequest {
    CollectionRequest {
        name: collection.name.clone(),
        description: collection.description.clone(),
        color: collection.color.clone(),
        icon: collection.icon.clone(),
        is_default: collection.is_default,
        is_shared: collection.is_shared,
        access_level: collection.access_level.as_str().to_string(),
    }
}

/// Build a domain collection from a server row. Not carried by the DTO:
/// `is_deleted`/`deleted_at`.
pub fn collection_from_dto(dto: CollectionDto) -> Collection {
    Collection {
        id: dto.id,
        user_id: dto.user_id,
        name: dto.name,
        description: dto.description,
        color: dto.color,
        icon: dto.icon,
        created_at: dto.created_at,
        updated_at: dto.updated_at,
        item_count: dto.item_count,
        is_default: dto.is_default,
        is_shared: dto.is_shared,
        share_url: dto.share_url,
        share_expiry: dto.share_expiry,
        access_level: AccessLevel::parse(&dto.access_level),
        sort_order: dto.sort_order,
        is_deleted: false,
        deleted_at: None,
        is_synced: true,
        is_local_id: false,
    }
}

/// Build the sharing request body from the owner's settings. The share URL
/// and resolved expiry instant are server-assigned and not sent.
pub fn sharing_to_request(settings: &ShareSettings) -> SharingRequest {
    SharingRequest {
        is_shared: settings.is_shared,
        access_level: settings.access_level.as_str().to_string(),
        expiry_days: settings.expiry_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashSet;

    fn sample_bookmark() -> Bookmark {
        let mut bookmark = Bookmark::new(
            7,
            "https://doc.rust-lang.org/book/",
            "Rust Book",
            Some("The book"),
            Tag::parse_tags("rust,learning").unwrap(),
        );
        bookmark.id = 42;
        bookmark.is_favorite = true;
        bookmark
    }

    #[test]
    fn bookmark_request_carries_content_fields_only() {
        let request = bookmark_to_request(&sample_bookmark());

        assert_eq!(request.collection_id, 7);
        assert_eq!(request.title, "Rust Book");
        assert_eq!(request.tags, vec!["learning", "rust"]);
    }

    #[test]
    fn bookmark_from_dto_sets_server_shadow_state() {
        let now = Utc::now();
        let dto = BookmarkDto {
            id: 42,
            collection_id: 7,
            title: "Rust Book".to_string(),
            url: "https://doc.rust-lang.org/book/".to_string(),
            description: None,
            favicon_url: None,
            image_url: None,
            is_favorite: true,
            is_archived: false,
            tags: vec!["rust".to_string(), "not a tag".to_string()],
            created_at: now,
            updated_at: now,
            last_opened: None,
            open_count: 3,
        };

        let bookmark = bookmark_from_dto(dto);

        assert!(bookmark.is_synced);
        assert!(!bookmark.is_local_id);
        assert!(bookmark.server_is_favorite);
        assert!(!bookmark.needs_flag_push());
        // invalid wire tag dropped, conversion stays total
        assert_eq!(bookmark.tags, Tag::parse_tags("rust").unwrap());
    }

    #[test]
    fn domain_to_dto_to_domain_round_trips_shared_fields() {
        let now = Utc::now();
        let dto = CollectionDto {
            id: 5,
            user_id: "user-1".to_string(),
            name: "Reading".to_string(),
            description: Some("long reads".to_string()),
            color: "#0F172A".to_string(),
            icon: Some("book".to_string()),
            created_at: now,
            updated_at: now,
            item_count: 2,
            is_default: false,
            is_shared: true,
            share_url: Some("https://share.example.com/abc".to_string()),
            share_expiry: None,
            access_level: "edit".to_string(),
            sort_order: 1,
        };

        let collection = collection_from_dto(dto.clone());
        let request = collection_to_request(&collection);

        assert_eq!(collection.access_level, AccessLevel::Edit);
        assert_eq!(request.name, dto.name);
        assert_eq!(request.color, dto.color);
        assert_eq!(request.access_level, "edit");
        assert!(request.is_shared);
    }

    #[test]
    fn sharing_request_from_settings() {
        let request = sharing_to_request(&ShareSettings {
            is_shared: true,
            access_level: AccessLevel::View,
            share_url: None,
            share_expiry: None,
            expiry_days: Some(30),
        });

        assert!(request.is_shared);
        assert_eq!(request.access_level, "view");
        assert_eq!(request.expiry_days, Some(30));
    }

    #[test]
    fn empty_wire_tags_become_empty_set() {
        let now = Utc::now();
        let dto = BookmarkDto {
            id: 1,
            collection_id: 1,
            title: "T".to_string(),
            url: "https://example.com".to_string(),
            description: None,
            favicon_url: None,
            image_url: None,
            is_favorite: false,
            is_archived: false,
            tags: vec![],
            created_at: now,
            updated_at: now,
            last_opened: None,
            open_count: 0,
        };

        assert_eq!(bookmark_from_dto(dto).tags, HashSet::new());
    }
}
