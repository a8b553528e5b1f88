use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::enums::{AlarmSound, Theme};
use crate::models::Settings;

/// Load the saved settings (singleton row, id = 1).
///
/// No saved row loads as `Settings::default()` — `{theme: dark, alarm: beep}`.
/// An unrecognized theme or alarm string also falls back to the default for
/// that field rather than failing the whole load.
pub fn load_settings(conn: &Connection) -> Result<Settings, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT theme, maps_api_key, calendar_client_id, gemini_api_key, alarm
         FROM settings WHERE id = 1",
    )?;
    let row = stmt
        .query_row([], |row| {
            Ok(Settings {
                theme: row
                    .get::<_, String>(0)?
                    .parse()
                    .unwrap_or(Theme::Dark),
                maps_api_key: row.get(1)?,
                calendar_client_id: row.get(2)?,
                gemini_api_key: row.get(3)?,
                alarm: row
                    .get::<_, String>(4)?
                    .parse()
                    .unwrap_or(AlarmSound::Beep),
            })
        })
        .optional()?;
    Ok(row.unwrap_or_default())
}

/// Save settings (upsert of the singleton row).
pub fn save_settings(conn: &Connection, settings: &Settings) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO settings (id, theme, maps_api_key, calendar_client_id, gemini_api_key, alarm, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
             theme = ?1,
             maps_api_key = ?2,
             calendar_client_id = ?3,
             gemini_api_key = ?4,
             alarm = ?5,
             updated_at = datetime('now')",
        params![
            settings.theme.as_str(),
            settings.maps_api_key,
            settings.calendar_client_id,
            settings.gemini_api_key,
            settings.alarm.as_str(),
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn load_without_save_returns_defaults() {
        let conn = open_memory_database().unwrap();
        let settings = load_settings(&conn).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.alarm, AlarmSound::Beep);
    }

    #[test]
    fn save_then_load_round_trips() {
        let conn = open_memory_database().unwrap();
        let settings = Settings {
            theme: Theme::Light,
            maps_api_key: Some("maps-key".into()),
            calendar_client_id: None,
            gemini_api_key: Some("gem-key".into()),
            alarm: AlarmSound::Bell,
        };
        save_settings(&conn, &settings).unwrap();
        assert_eq!(load_settings(&conn).unwrap(), settings);
    }

    #[test]
    fn second_save_overwrites_first() {
        let conn = open_memory_database().unwrap();
        save_settings(
            &conn,
            &Settings {
                theme: Theme::Light,
                alarm: AlarmSound::Chime,
                ..Settings::default()
            },
        )
        .unwrap();
        save_settings(&conn, &Settings::default()).unwrap();

        let loaded = load_settings(&conn).unwrap();
        assert_eq!(loaded.theme, Theme::Dark);
        assert_eq!(loaded.alarm, AlarmSound::Beep);

        // Still a singleton row
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn corrupt_enum_value_falls_back_to_default() {
        let conn = open_memory_database().unwrap();
        save_settings(&conn, &Settings::default()).unwrap();
        conn.execute("UPDATE settings SET alarm = 'airhorn' WHERE id = 1", [])
            .unwrap();
        let loaded = load_settings(&conn).unwrap();
        assert_eq!(loaded.alarm, AlarmSound::Beep);
    }
}
