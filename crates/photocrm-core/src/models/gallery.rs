//! Public client gallery and the client's photo selection.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub filename: String,
    pub thumbnail_url: String,
    pub preview_url: Option<String>,
    pub original_url: String,
    #[serde(default)]
    pub is_selected: bool,
    pub price: Option<f64>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gallery {
    pub order_id: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
    pub total_photos: u32,
    pub selection_limit: Option<u32>,
    pub client_info: Option<ClientInfo>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Photo {0} is not in this gallery")]
    UnknownPhoto(String),

    #[error("Selection limit of {0} photos reached")]
    LimitReached(u32),
}

/// The set of photos a client has picked from a gallery.
///
/// Only ids present in the gallery can be selected, and the gallery's
/// `selection_limit` is never exceeded.
#[derive(Debug, Clone, Default)]
pub struct PhotoSelection {
    selected: BTreeSet<String>,
    limit: Option<u32>,
}

impl PhotoSelection {
    /// Start from the photos the server already marks as selected.
    pub fn from_gallery(gallery: &Gallery) -> Self {
        let selected = gallery
            .photos
            .iter()
            .filter(|p| p.is_selected)
            .map(|p| p.id.clone())
            .collect();
        Self {
            selected,
            limit: gallery.selection_limit,
        }
    }

    /// Toggle a photo. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, gallery: &Gallery, photo_id: &str) -> Result<bool, SelectionError> {
        if self.selected.remove(photo_id) {
            return Ok(false);
        }
        if !gallery.photos.iter().any(|p| p.id == photo_id) {
            return Err(SelectionError::UnknownPhoto(photo_id.to_string()));
        }
        if let Some(limit) = self.limit {
            if self.selected.len() >= limit as usize {
                return Err(SelectionError::LimitReached(limit));
            }
        }
        self.selected.insert(photo_id.to_string());
        Ok(true)
    }

    pub fn is_selected(&self, photo_id: &str) -> bool {
        self.selected.contains(photo_id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Selected photos in gallery order.
    pub fn photos<'a>(&self, gallery: &'a Gallery) -> Vec<&'a Photo> {
        gallery
            .photos
            .iter()
            .filter(|p| self.selected.contains(&p.id))
            .collect()
    }

    /// Sum of the prices of the selected photos; unpriced photos count as 0.
    pub fn total_price(&self, gallery: &Gallery) -> f64 {
        self.photos(gallery)
            .iter()
            .map(|p| p.price.unwrap_or(0.0))
            .sum()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
