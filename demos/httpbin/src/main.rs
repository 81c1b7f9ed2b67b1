//! httpbin example
//!
//! Drives a shared courier client against <https://httpbin.org>.

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use courier::prelude::*;

/// What httpbin echoes back for `/anything`.
#[derive(Debug, Clone, Deserialize)]
pub struct Echo {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// A new pet, sent as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct NewPet {
    pub name: String,
    pub kind: String,
}

/// Listing filters, sent as query parameters.
#[derive(Debug, Clone, Params)]
#[param(rename_all = "camelCase")]
pub struct ListPets {
    pub page_size: u32,
    pub cursor: Option<String>,
    #[param(format = "csv")]
    pub kinds: Vec<String>,
}

pub fn build_client(base_url: &str) -> Arc<Client> {
    let mut client = Client::new();
    client
        .set_base_url(base_url)
        .set_user_agent("courier-httpbin-example")
        .set_header("Accept", "application/json")
        .set_timeout(Duration::from_secs(10))
        .set_cookie_jar(Arc::new(MemoryCookieJar::new()))
        .add_response_hook(|_, response, request| {
            if response.is_success() {
                Ok(())
            } else {
                Err(Error::hook(format!(
                    "{} {} answered {}",
                    request.method(),
                    request.url(),
                    response.status_code()
                )))
            }
        });
    client.into_shared()
}

pub async fn create_pet(client: &Arc<Client>, pet: NewPet) -> Result<Echo> {
    let response = client
        .r()
        .set_path_param("kind", pet.kind.clone())
        .set_json(pet)
        .post("/anything/pets/:kind")
        .await?;
    let echo = response.json();
    response.close();
    echo
}

pub async fn list_pets(client: &Arc<Client>, filter: &ListPets) -> Result<Echo> {
    let response = client
        .r()
        .set_params_with(filter)
        .get("/anything/pets")
        .await?;
    let echo = response.json();
    response.close();
    echo
}

#[tokio::main]
async fn main() -> courier::Result<()> {
    let client = build_client("https://httpbin.org");

    let created = create_pet(
        &client,
        NewPet {
            name: "Rex".to_string(),
            kind: "dog".to_string(),
        },
    )
    .await?;
    println!("{} {}", created.method, created.url);

    let listed = list_pets(
        &client,
        &ListPets {
            page_size: 20,
            cursor: None,
            kinds: vec!["dog".to_string(), "cat".to_string()],
        },
    )
    .await?;
    println!("{} {} {:?}", listed.method, listed.url, listed.args);

    let cookies = client.get("/cookies/set?flavour=oat").await?;
    println!("cookies: {:?}", cookies.cookies());
    cookies.close();

    Ok(())
}
