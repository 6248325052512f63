use serde_json::{json, Value};

/// Two-location template that passes every validation rule.
pub fn sample_value() -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {
                    "nama_lokasi": "Contoh Terminal Bus",
                    "jenis_lokasi": "Terminal",
                    "jam_ramainya": "06:00 - 10:00 & 16:00 - 20:00",
                    "tingkat_kepadatan": 5,
                    "tingkat_keamanan": 4,
                    "akses_internet": 3,
                    "kenyamanan": 4,
                    "fasilitas": "Tempat duduk, warung, toilet, mushola",
                    "alamat": "Jl. Contoh No.1, Jakarta Pusat"
                },
                "geometry": {
                    "type": "Point",
                    "coordinates": [106.8456, -6.2088]
                }
            },
            {
                "type": "Feature",
                "properties": {
                    "nama_lokasi": "Contoh Minimarket",
                    "jenis_lokasi": "Minimarket",
                    "jam_ramainya": "07:00 - 09:00 & 17:00 - 19:00",
                    "tingkat_kepadatan": 3,
                    "tingkat_keamanan": 4,
                    "akses_internet": 4,
                    "kenyamanan": 3,
                    "fasilitas": "Tempat duduk, ATM",
                    "alamat": "Jl. Contoh No.2, Jakarta Selatan"
                },
                "geometry": {
                    "type": "Point",
                    "coordinates": [106.82, -6.25]
                }
            }
        ]
    })
}

/// The sample document pretty-printed with two-space indentation, ready
/// to be offered as a download.
pub fn generate_sample() -> String {
    // A json! literal of strings and finite numbers always serializes.
    serde_json::to_string_pretty(&sample_value()).unwrap_or_default()
}
