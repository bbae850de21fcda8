#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use smol_str::SmolStr;
use webparts_core::{
    ConnectionPoint, ConnectionPointKind, ConnectionPointSet, InterfaceType, LoadContext, Part,
    PartError, PartType, Personalizable, PersonalizationDictionary, PersonalizationEntry,
    PersonalizationScope, PropertyDescriptor, PropertyMap, PropertyValue, TrackingPersonalizable,
    VersioningPersonalizable,
};
use webparts_runtime::manager::{
    AuthorizationRequest, HookContext, HookDecision, ManagerEvent, ManagerHooks,
};
use webparts_runtime::{
    DisplayMode, PageHarness, PartRegistry, PersonalizationConfig, RequestContext, WebPartManager,
    WebPartsError, Zone,
};

pub const ZIP_INTERFACE: &str = "IZipCode";

pub fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(name, value)| ((*name).into(), value.clone()))
        .collect()
}

/// Part with typed properties and nothing else.
#[derive(Debug, Clone)]
pub struct SimplePart {
    pub id: SmolStr,
    part_type: PartType,
    descriptors: Vec<PropertyDescriptor>,
    values: PropertyMap,
}

impl SimplePart {
    pub fn new(
        id: &str,
        part_type: PartType,
        descriptors: Vec<PropertyDescriptor>,
        values: PropertyMap,
    ) -> Self {
        Self {
            id: id.into(),
            part_type,
            descriptors,
            values,
        }
    }

    /// `Title` is shared; `ShowWeekends` and `DaysShown` are per user.
    pub fn calendar(id: &str) -> Self {
        Self::new(
            id,
            PartType::new("Calendar"),
            vec![
                PropertyDescriptor::shared("Title"),
                PropertyDescriptor::user("ShowWeekends"),
                PropertyDescriptor::user("DaysShown"),
            ],
            props(&[
                ("Title", "Calendar".into()),
                ("ShowWeekends", false.into()),
                ("DaysShown", 7.into()),
            ]),
        )
    }

    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }
}

impl Part for SimplePart {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        self.part_type.clone()
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        self.descriptors.clone()
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        self.values.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError> {
        let Some(current) = self.values.get(name) else {
            return Err(PartError::UnknownProperty(name.into()));
        };
        if current.kind() != value.kind() && !value.is_null() {
            return Err(PartError::TypeMismatch {
                property: name.into(),
                expected: current.kind(),
                found: value.kind(),
            });
        }
        if name == "DaysShown" && value.as_int().is_some_and(|days| days <= 0) {
            return Err(PartError::Rejected {
                property: name.into(),
                reason: "must be positive".into(),
            });
        }
        self.values.insert(name.into(), value);
        Ok(())
    }
}

/// Part keeping free-form notes as custom state, optionally tracking changes.
#[derive(Debug, Clone, Default)]
pub struct NotesPart {
    pub id: SmolStr,
    pub title: SmolStr,
    pub notes: Option<SmolStr>,
    pub banner: Option<SmolStr>,
    pub dirty: bool,
    pub tracks_changes: bool,
    pub dirty_on_load: bool,
    pub log: Vec<&'static str>,
}

impl NotesPart {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            title: "Notes".into(),
            ..Self::default()
        }
    }

    pub fn tracking(id: &str) -> Self {
        Self {
            tracks_changes: true,
            ..Self::new(id)
        }
    }

    pub fn write(&mut self, notes: &str) {
        self.notes = Some(notes.into());
        self.dirty = true;
    }
}

impl Part for NotesPart {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        PartType::new("Notes")
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        vec![PropertyDescriptor::user("Title")]
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "Title" => Some(PropertyValue::String(self.title.clone())),
            "Notes" => self.notes.clone().map(PropertyValue::String),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError> {
        match (name, value) {
            ("Title", PropertyValue::String(title)) => {
                self.title = title;
                Ok(())
            }
            ("Title", other) => Err(PartError::TypeMismatch {
                property: name.into(),
                expected: "string",
                found: other.kind(),
            }),
            _ => Err(PartError::UnknownProperty(name.into())),
        }
    }

    fn as_personalizable(&mut self) -> Option<&mut dyn Personalizable> {
        Some(self)
    }

    fn as_tracking(&mut self) -> Option<&mut dyn TrackingPersonalizable> {
        Some(self)
    }
}

impl Personalizable for NotesPart {
    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn load(&mut self, state: &PersonalizationDictionary, cx: &mut LoadContext) {
        self.log.push("load");
        self.notes = state.value("notes").and_then(PropertyValue::as_str).map(SmolStr::new);
        self.banner = state.value("banner").and_then(PropertyValue::as_str).map(SmolStr::new);
        if self.dirty_on_load {
            cx.set_dirty();
        }
    }

    fn save(&self, state: &mut PersonalizationDictionary) {
        if let Some(notes) = &self.notes {
            state.insert(
                "notes",
                PersonalizationEntry::new(notes.clone(), PersonalizationScope::User),
            );
        }
        if let Some(banner) = &self.banner {
            state.insert(
                "banner",
                PersonalizationEntry::new(banner.clone(), PersonalizationScope::Shared),
            );
        }
    }
}

impl TrackingPersonalizable for NotesPart {
    fn tracks_changes(&self) -> bool {
        self.tracks_changes
    }

    fn begin_load(&mut self) {
        self.log.push("begin_load");
    }

    fn end_load(&mut self, _cx: &mut LoadContext) {
        self.log.push("end_load");
    }

    fn begin_save(&mut self) {
        self.log.push("begin_save");
    }

    fn end_save(&mut self) {
        self.log.push("end_save");
    }
}

/// Part that takes over stored values it no longer declares.
#[derive(Debug, Clone, Default)]
pub struct VersionedPart {
    pub id: SmolStr,
    pub height: i32,
    pub unused: Option<PropertyMap>,
}

impl VersionedPart {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            height: 100,
            unused: None,
        }
    }
}

impl Part for VersionedPart {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        PartType::new("Versioned")
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        vec![PropertyDescriptor::user("Height")]
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        (name == "Height").then_some(PropertyValue::Int(self.height))
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError> {
        match value.as_int() {
            Some(height) if name == "Height" => {
                self.height = height;
                Ok(())
            }
            _ => Err(PartError::UnknownProperty(name.into())),
        }
    }

    fn as_versioning(&mut self) -> Option<&mut dyn VersioningPersonalizable> {
        Some(self)
    }
}

impl VersioningPersonalizable for VersionedPart {
    fn load_unused(&mut self, unused: &PropertyMap) {
        self.unused = Some(unused.clone());
    }
}

/// Provides a zip code on `zip` (one connection) and an address row on `row`.
#[derive(Debug, Clone)]
pub struct ZipProvider {
    pub id: SmolStr,
    pub zip: SmolStr,
    pub secondary: Vec<InterfaceType>,
    pub disabled: Vec<SmolStr>,
}

impl ZipProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            zip: "98052".into(),
            secondary: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

impl Part for ZipProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        PartType::new("ZipProvider")
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        vec![PropertyDescriptor::user("Zip")]
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        (name == "Zip").then(|| PropertyValue::String(self.zip.clone()))
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError> {
        match (name, value) {
            ("Zip", PropertyValue::String(zip)) => {
                self.zip = zip;
                Ok(())
            }
            _ => Err(PartError::UnknownProperty(name.into())),
        }
    }

    fn describe_connection_points(&self, _culture: &str) -> ConnectionPointSet {
        let owner = self.part_type();
        ConnectionPointSet::new(owner.clone())
            .with(
                ConnectionPoint::provider(
                    &owner,
                    "zip",
                    "Zip code",
                    InterfaceType::new(ZIP_INTERFACE),
                )
                .allowing_multiple(false),
            )
            .with(ConnectionPoint::provider(
                &owner,
                "row",
                "Address",
                InterfaceType::new(webparts_runtime::connection::ROW_INTERFACE),
            ))
    }

    fn connection_point_enabled(&self, _kind: ConnectionPointKind, point_id: &str) -> bool {
        !self.disabled.iter().any(|id| id == point_id)
    }

    fn secondary_interfaces(&self, point_id: &str) -> Vec<InterfaceType> {
        if point_id == "zip" {
            self.secondary.clone()
        } else {
            Vec::new()
        }
    }

    fn provide(&self, point_id: &str) -> Option<PropertyValue> {
        match point_id {
            "zip" => Some(PropertyValue::String(self.zip.clone())),
            "row" => Some(
                webparts_core::CompositeValue::new("Address")
                    .with_field("city", "Redmond")
                    .with_field("zip", self.zip.clone())
                    .into(),
            ),
            _ => None,
        }
    }
}

/// Consumes a zip code on `zip` or a single field on `field`.
#[derive(Debug, Clone)]
pub struct WeatherConsumer {
    pub id: SmolStr,
    pub city: SmolStr,
    pub received: Option<PropertyValue>,
    pub received_on: Option<SmolStr>,
    pub rejects_secondary: bool,
    pub requires_secondary: bool,
}

impl WeatherConsumer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            city: "Seattle".into(),
            received: None,
            received_on: None,
            rejects_secondary: false,
            requires_secondary: false,
        }
    }
}

impl Part for WeatherConsumer {
    fn id(&self) -> &str {
        &self.id
    }

    fn part_type(&self) -> PartType {
        PartType::new("Weather")
    }

    fn describe_properties(&self) -> Vec<PropertyDescriptor> {
        vec![PropertyDescriptor::user("City")]
    }

    fn property(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "City" => Some(PropertyValue::String(self.city.clone())),
            "Received" => self.received.clone(),
            "ReceivedOn" => self.received_on.clone().map(PropertyValue::String),
            _ => None,
        }
    }

    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), PartError> {
        match (name, value) {
            ("City", PropertyValue::String(city)) => {
                self.city = city;
                Ok(())
            }
            _ => Err(PartError::UnknownProperty(name.into())),
        }
    }

    fn describe_connection_points(&self, culture: &str) -> ConnectionPointSet {
        let owner = self.part_type();
        let label = if culture == "de" { "Postleitzahl" } else { "Zip code" };
        ConnectionPointSet::new(owner.clone())
            .with(ConnectionPoint::provider(
                &owner,
                "forecast",
                "Forecast",
                InterfaceType::new("IForecast"),
            ))
            .with(ConnectionPoint::consumer(
                &owner,
                "zip",
                label,
                InterfaceType::new(ZIP_INTERFACE),
            ))
            .with(ConnectionPoint::consumer(
                &owner,
                "field",
                "Field",
                InterfaceType::new(webparts_runtime::connection::FIELD_INTERFACE),
            ))
    }

    fn accepts_secondary_interfaces(&self, _point_id: &str, secondary: &[InterfaceType]) -> bool {
        if self.requires_secondary {
            return !secondary.is_empty();
        }
        !(self.rejects_secondary && !secondary.is_empty())
    }

    fn provide(&self, point_id: &str) -> Option<PropertyValue> {
        (point_id == "forecast").then(|| PropertyValue::from(format!("sunny in {}", self.city)))
    }

    fn consume(&mut self, point_id: &str, value: Option<PropertyValue>) {
        self.received = value;
        self.received_on = Some(point_id.into());
    }
}

pub fn catalog() -> PartRegistry {
    PartRegistry::new()
        .with(
            PartType::new("Calendar"),
            Arc::new(|id: &str| Box::new(SimplePart::calendar(id)) as Box<dyn Part>),
        )
        .with(
            PartType::new("Notes"),
            Arc::new(|id: &str| Box::new(NotesPart::new(id)) as Box<dyn Part>),
        )
        .with(
            PartType::new("ZipProvider"),
            Arc::new(|id: &str| Box::new(ZipProvider::new(id)) as Box<dyn Part>),
        )
        .with(
            PartType::new("Weather"),
            Arc::new(|id: &str| Box::new(WeatherConsumer::new(id)) as Box<dyn Part>),
        )
}

pub fn user_harness() -> PageHarness {
    PageHarness::new(PersonalizationConfig::default(), Arc::new(catalog()))
}

pub fn use_shared_scope(harness: &mut PageHarness) {
    let config = harness.config_mut();
    config.initial_scope = PersonalizationScope::Shared;
    config.can_enter_shared_scope = true;
}

pub fn use_user_scope(harness: &mut PageHarness) {
    let config = harness.config_mut();
    config.initial_scope = PersonalizationScope::User;
    config.can_enter_shared_scope = false;
}

/// Two web part zones, an editor and a connections zone, and three static parts.
pub fn portal_page(manager: &mut WebPartManager) -> Result<(), WebPartsError> {
    manager.register_zone(Zone::web_parts("left"))?;
    manager.register_zone(Zone::web_parts("right"))?;
    manager.register_zone(Zone::tool("editor", [DisplayMode::Edit]))?;
    manager.register_zone(Zone::tool("connections", [DisplayMode::Connect]))?;
    manager.add_static_part("left", Box::new(SimplePart::calendar("calendar1")))?;
    manager.add_static_part("right", Box::new(ZipProvider::new("zip1")))?;
    manager.add_static_part("right", Box::new(WeatherConsumer::new("weather1")))?;
    Ok(())
}

/// A manager for `request` that has restored and personalized `page`.
pub fn ready<P>(harness: &PageHarness, request: RequestContext, page: P) -> WebPartManager
where
    P: FnOnce(&mut WebPartManager) -> Result<(), WebPartsError>,
{
    let mut manager = harness.manager(request);
    page(&mut manager).expect("page structure");
    manager.on_init().expect("init");
    manager.on_init_complete().expect("init complete");
    manager
}

pub fn property(manager: &WebPartManager, part: &str, name: &str) -> Option<PropertyValue> {
    manager.part(part)?.part().property(name)
}

/// Records hook traffic and cancels or denies on request.
#[derive(Clone, Default)]
pub struct RecordingHooks {
    pub before: Arc<Mutex<Vec<(ManagerEvent, HookContext)>>>,
    pub after: Arc<Mutex<Vec<ManagerEvent>>>,
    pub cancel: Option<fn(&ManagerEvent) -> bool>,
    pub denied: Vec<PartType>,
}

impl RecordingHooks {
    pub fn cancelling(cancel: fn(&ManagerEvent) -> bool) -> Self {
        Self {
            cancel: Some(cancel),
            ..Self::default()
        }
    }

    pub fn denying(part_type: PartType) -> Self {
        Self {
            denied: vec![part_type],
            ..Self::default()
        }
    }

    pub fn after_events(&self) -> Vec<ManagerEvent> {
        self.after.lock().clone()
    }
}

impl ManagerHooks for RecordingHooks {
    fn before(&mut self, event: &ManagerEvent, cx: HookContext) -> HookDecision {
        self.before.lock().push((event.clone(), cx));
        match self.cancel {
            Some(cancel) if cancel(event) => HookDecision::Cancel,
            _ => HookDecision::Proceed,
        }
    }

    fn after(&mut self, event: &ManagerEvent) {
        self.after.lock().push(event.clone());
    }

    fn authorize(&mut self, request: &AuthorizationRequest) -> bool {
        !self.denied.contains(&request.part_type)
    }
}
