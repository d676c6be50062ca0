//! Resource payloads exchanged with the API
//!
//! Every field is optional on the wire: missing fields default and unknown
//! fields are ignored.

use crate::cache::ResourceKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// A payload that can be listed, fetched and cached
pub trait Resource: DeserializeOwned {
    const KIND: ResourceKind;

    fn identifier(&self) -> &str;

    /// Name recorded in the resolution cache
    fn name(&self) -> &str;
}

/// Decode `null` the same way as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpAddress {
    #[serde(deserialize_with = "null_as_default")]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volume {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub size: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modification_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modification_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub root_volume: Volume,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modification_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub size: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub organization: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
    #[serde(deserialize_with = "null_as_default")]
    pub volume_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub base_volume: Volume,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootCmdArgs {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Initrd {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kernel {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dtb: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
}

/// Boot configuration; identified by its title rather than a name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bootscript {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bootcmdargs: BootCmdArgs,
    #[serde(deserialize_with = "null_as_default")]
    pub initrd: Initrd,
    #[serde(deserialize_with = "null_as_default")]
    pub kernel: Kernel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub creation_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub modification_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub image: Image,
    pub public_ip: Option<IpAddress>,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
}

/// Body of a server creation request
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerDefinition {
    pub name: String,
    pub image: String,
    pub bootscript: Option<String>,
    pub organization: String,
}

/// Power actions accepted by `POST /servers/{id}/action`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerAction {
    Poweron,
    Poweroff,
    Reboot,
    Terminate,
}

#[derive(Debug, Serialize)]
pub(crate) struct ServerActionRequest {
    pub action: ServerAction,
}

macro_rules! impl_resource {
    ($ty:ty, $kind:expr, $name:ident) => {
        impl Resource for $ty {
            const KIND: ResourceKind = $kind;

            fn identifier(&self) -> &str {
                &self.id
            }

            fn name(&self) -> &str {
                &self.$name
            }
        }
    };
}

impl_resource!(Server, ResourceKind::Server, name);
impl_resource!(Image, ResourceKind::Image, name);
impl_resource!(Snapshot, ResourceKind::Snapshot, name);
impl_resource!(Bootscript, ResourceKind::Bootscript, title);
