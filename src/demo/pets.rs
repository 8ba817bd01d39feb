//! A small pet catalog served by one encoding module per wire format.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use fx_server::module::{ApiModule, Codec};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "pet")]
pub struct Pet {
    pub id: u64,
    pub name: String,
    pub species: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "pet")]
pub struct NewPet {
    pub name: String,
    pub species: String,
}

/// Top-level wrapper so XML output has a single root element.
#[derive(Debug, Serialize)]
#[serde(rename = "pets")]
struct PetList<'a> {
    pet: &'a [Pet],
}

#[derive(Debug, Serialize)]
#[serde(rename = "error")]
struct ApiError<'a> {
    message: &'a str,
}

/// Shared in-memory catalog. Clones see the same pets.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pets: Arc<RwLock<Vec<Pet>>>,
}

impl Catalog {
    pub fn seeded() -> Self {
        let pets = vec![
            Pet {
                id: 1,
                name: "Rex".into(),
                species: "dog".into(),
            },
            Pet {
                id: 2,
                name: "Tom".into(),
                species: "cat".into(),
            },
        ];
        Self {
            pets: Arc::new(RwLock::new(pets)),
        }
    }

    async fn add(&self, new: NewPet) -> Pet {
        let mut pets = self.pets.write().await;
        let id = pets.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let pet = Pet {
            id,
            name: new.name,
            species: new.species,
        };
        pets.push(pet.clone());
        pet
    }
}

struct PetApi<C: Codec> {
    module: ApiModule<C>,
    catalog: Catalog,
}

impl<C: Codec> Clone for PetApi<C> {
    fn clone(&self) -> Self {
        Self {
            module: self.module.clone(),
            catalog: self.catalog.clone(),
        }
    }
}

/// Build a catalog module speaking `C`.
pub fn module<C: Codec>(catalog: Catalog) -> ApiModule<C> {
    ApiModule::new(move |module, router| {
        let state = PetApi {
            module: module.clone(),
            catalog: catalog.clone(),
        };
        router
            .route(
                "/pets",
                get(list_pets::<C>)
                    .post(create_pet::<C>)
                    .with_state(state.clone()),
            )
            .route("/pets/{id}", get(show_pet::<C>).with_state(state));
        Ok(())
    })
}

async fn list_pets<C: Codec>(State(api): State<PetApi<C>>) -> Response {
    let pets = api.catalog.pets.read().await;
    api.module.respond(StatusCode::OK, &PetList { pet: &pets })
}

async fn show_pet<C: Codec>(State(api): State<PetApi<C>>, Path(id): Path<u64>) -> Response {
    let pets = api.catalog.pets.read().await;
    match pets.iter().find(|p| p.id == id) {
        Some(pet) => api.module.respond(StatusCode::OK, pet),
        None => api.module.respond(
            StatusCode::NOT_FOUND,
            &ApiError {
                message: "pet not found",
            },
        ),
    }
}

async fn create_pet<C: Codec>(State(api): State<PetApi<C>>, body: Bytes) -> Response {
    match api.module.decode_request::<NewPet>(&body) {
        Ok(new) => {
            let pet = api.catalog.add(new).await;
            api.module.respond(StatusCode::CREATED, &pet)
        }
        Err(e) => e.into_response(),
    }
}
