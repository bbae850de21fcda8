#![allow(dead_code)]

use webparts_core::{
    CompositeValue, EnumValue, PartType, PersonalizationDictionary, PersonalizationEntry,
    PersonalizationMap, PersonalizationRecord, PersonalizationScope, PropertyMap, PropertyValue,
};

pub fn props(pairs: &[(&str, PropertyValue)]) -> PropertyMap {
    pairs
        .iter()
        .map(|(name, value)| ((*name).into(), value.clone()))
        .collect()
}

pub fn sample_map() -> PersonalizationMap {
    let mut custom = PersonalizationDictionary::new();
    custom.insert(
        "feeds",
        PersonalizationEntry::new(
            PropertyValue::List(vec!["world".into(), "sport".into()]),
            PersonalizationScope::User,
        ),
    );
    custom.insert(
        "apiKey",
        PersonalizationEntry::sensitive("k-123", PersonalizationScope::Shared),
    );

    let calendar = PersonalizationRecord::for_static("calendar1", PartType::new("CalendarPart"))
        .with_properties(props(&[
            ("Title", "My calendar".into()),
            ("DaysShown", 14.into()),
            ("FirstDay", EnumValue::new("DayOfWeek", "Monday", 1).into()),
        ]));
    let news = PersonalizationRecord::for_static("news1", PartType::templated("~/parts/news.tpl"))
        .with_properties(props(&[("Height", PropertyValue::Double(240.5))]))
        .with_custom_properties(custom);
    let dynamic = PersonalizationRecord::new("wp1843").with_properties(props(&[
        ("Size", CompositeValue::new("Size").with_field("w", 3).with_field("h", 2).into()),
        ("Visits", PropertyValue::Long(1 << 40)),
        ("Subtitle", PropertyValue::Null),
        ("Title", "Stocks".into()),
    ]));

    [calendar, news, dynamic]
        .into_iter()
        .map(|record| (record.control_id.clone(), record))
        .collect()
}
